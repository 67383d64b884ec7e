use super::{Dimensions, ImageService, TransformParams};
use crate::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedOp {
    Dimensions(PathBuf),
    Resize(TransformParams),
    Cover(TransformParams),
}

/// Records every call without touching pixels.
#[derive(Clone)]
pub struct MockImageProcessor {
    operations: Arc<Mutex<Vec<RecordedOp>>>,
    default_dimensions: Dimensions,
    dimensions: Arc<Mutex<HashMap<PathBuf, Dimensions>>>,
    failing_sources: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockImageProcessor {
    pub fn new() -> Self {
        Self {
            operations: Arc::new(Mutex::new(Vec::new())),
            default_dimensions: Dimensions::new(1024, 768),
            dimensions: Arc::new(Mutex::new(HashMap::new())),
            failing_sources: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_default_dimensions(mut self, width: u32, height: u32) -> Self {
        self.default_dimensions = Dimensions::new(width, height);
        self
    }

    pub fn with_dimensions(self, source: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        self.dimensions
            .lock()
            .unwrap()
            .insert(source.into(), Dimensions::new(width, height));
        self
    }

    /// Any transform reading `source` fails.
    pub fn with_failing_source(self, source: impl Into<PathBuf>) -> Self {
        self.failing_sources.lock().unwrap().insert(source.into());
        self
    }

    pub fn get_operations(&self) -> Vec<RecordedOp> {
        self.operations.lock().unwrap().clone()
    }

    /// Transforms only, in call order.
    pub fn get_transforms(&self) -> Vec<RecordedOp> {
        self.get_operations()
            .into_iter()
            .filter(|op| !matches!(op, RecordedOp::Dimensions(_)))
            .collect()
    }

    fn check_source(&self, source: &Path) -> Result<()> {
        if self.failing_sources.lock().unwrap().contains(source) {
            return Err(crate::Error::Image(image::ImageError::IoError(
                std::io::Error::other(format!("Mock failure for {}", source.display())),
            )));
        }
        Ok(())
    }
}

impl Default for MockImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageService for MockImageProcessor {
    async fn dimensions(&self, source: &Path) -> Result<Dimensions> {
        self.operations
            .lock()
            .unwrap()
            .push(RecordedOp::Dimensions(source.to_path_buf()));
        self.check_source(source)?;

        Ok(self
            .dimensions
            .lock()
            .unwrap()
            .get(source)
            .copied()
            .unwrap_or(self.default_dimensions))
    }

    async fn resize(&self, params: &TransformParams) -> Result<()> {
        self.operations
            .lock()
            .unwrap()
            .push(RecordedOp::Resize(params.clone()));
        self.check_source(&params.source)
    }

    async fn cover(&self, params: &TransformParams) -> Result<()> {
        self.operations
            .lock()
            .unwrap()
            .push(RecordedOp::Cover(params.clone()));
        self.check_source(&params.source)
    }
}
