//! Derives resized, cover and thumbnail variants for uploaded images.
//!
//! The [`Resizer`] owns an immutable task list and two capabilities: the
//! [`ImageService`] that does the pixel work and an optional
//! [`UploadService`] used by the middleware. Tasks run one after another in
//! list order; the first failure stops the pipeline for that file.

use crate::image::{calculate_fit_dimensions, ImageService, TransformParams};
use crate::middleware::{UploadMiddleware, UploadMode};
use crate::models::{Attachment, ResizerConfig, Task, TaskKind, TaskSpec};
use crate::naming;
use crate::upload::UploadService;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct Resizer {
    config: ResizerConfig,
    image: Arc<dyn ImageService>,
    upload: Option<Arc<dyn UploadService>>,
}

impl Resizer {
    pub fn new(config: ResizerConfig, image: Arc<dyn ImageService>) -> Self {
        Self {
            config,
            image,
            upload: None,
        }
    }

    /// Attach the upload capability the middleware runs before resizing.
    pub fn with_upload(mut self, upload: Arc<dyn UploadService>) -> Self {
        self.upload = Some(upload);
        self
    }

    pub fn config(&self) -> &ResizerConfig {
        &self.config
    }

    pub(crate) fn upload_service(&self) -> Option<&Arc<dyn UploadService>> {
        self.upload.as_ref()
    }

    fn transform_params(
        source: &Path,
        spec: &TaskSpec,
        kind: TaskKind,
        width: u32,
        height: u32,
    ) -> TransformParams {
        let format = spec.format_or_default();
        let suffix = spec.suffix.as_deref().unwrap_or(kind.default_suffix());

        TransformParams {
            source: source.to_path_buf(),
            output: naming::derived_path(source, suffix, format),
            width,
            height,
            interpolation: spec.interpolation_or_default(),
            format,
        }
    }

    async fn create_filled(
        &self,
        path: &Path,
        spec: &TaskSpec,
        kind: TaskKind,
    ) -> Result<PathBuf> {
        let params = Self::transform_params(path, spec, kind, spec.width, spec.height);
        self.image.cover(&params).await?;

        info!(
            "Created {} {}x{} at {}",
            kind.key(),
            params.width,
            params.height,
            params.output.display()
        );
        Ok(params.output)
    }

    /// Crop-and-fill to exactly `spec.width` x `spec.height`.
    pub async fn create_cover(&self, path: &Path, spec: &TaskSpec) -> Result<PathBuf> {
        self.create_filled(path, spec, TaskKind::Cover).await
    }

    /// Same as [`create_cover`](Self::create_cover) with the `thumbnail` suffix.
    pub async fn create_thumbnail(&self, path: &Path, spec: &TaskSpec) -> Result<PathBuf> {
        self.create_filled(path, spec, TaskKind::Thumbnail).await
    }

    /// Scale down to fit `spec.width` x `spec.height`; never scales up.
    pub async fn create_resized(&self, path: &Path, spec: &TaskSpec) -> Result<PathBuf> {
        let source = self.image.dimensions(path).await?;
        let (width, height) = calculate_fit_dimensions(
            (source.width, source.height),
            (spec.width, spec.height),
        );

        let params = Self::transform_params(path, spec, TaskKind::Resize, width, height);
        self.image.resize(&params).await?;

        info!(
            "Created resize {}x{} -> {}x{} at {}",
            source.width,
            source.height,
            width,
            height,
            params.output.display()
        );
        Ok(params.output)
    }

    pub async fn run_task(&self, path: &Path, task: &Task) -> Result<PathBuf> {
        match task {
            Task::Resize(spec) => self.create_resized(path, spec).await,
            Task::Cover(spec) => self.create_cover(path, spec).await,
            Task::Thumbnail(spec) => self.create_thumbnail(path, spec).await,
        }
    }

    /// Run every configured task against `path`, recording outputs on `attachment`.
    pub async fn process_image(&self, path: &Path, attachment: &mut Attachment) -> Result<()> {
        for (index, task) in self.config.tasks.iter().enumerate() {
            debug!(
                "Running task #{} ({}) on {}",
                index,
                task.kind().key(),
                path.display()
            );
            let output = self.run_task(path, task).await?;
            attachment.set_derived_path(task.kind(), output);
        }
        Ok(())
    }

    /// Process each file in order, stopping at the first failure.
    ///
    /// Files before the failing one keep their derived paths; files after it
    /// are never touched.
    pub async fn process_files(&self, files: &mut [Attachment]) -> Result<()> {
        for file in files.iter_mut() {
            let path = file.path.clone();
            if let Err(e) = self.process_image(&path, file).await {
                error!("Processing {} failed: {}", path.display(), e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Middleware accepting one file from `field`.
    pub fn single(self: &Arc<Self>, field: impl Into<String>) -> UploadMiddleware {
        UploadMiddleware::new(
            Arc::clone(self),
            UploadMode::Single {
                field: field.into(),
            },
        )
    }

    /// Middleware accepting up to `max_count` files from `field`.
    pub fn array(
        self: &Arc<Self>,
        field: impl Into<String>,
        max_count: usize,
    ) -> UploadMiddleware {
        UploadMiddleware::new(
            Arc::clone(self),
            UploadMode::Array {
                field: field.into(),
                max_count,
            },
        )
    }
}
