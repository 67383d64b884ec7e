//! Image processing capability
//!
//! The resizer only decides *what* to produce; the pixel work (decode,
//! transform, encode) sits behind [`ImageService`]. [`ImageProcessor`] does it
//! with the `image` crate and [`MockImageProcessor`] records calls for tests.

pub mod calculations;
pub mod mock;
pub mod processor;

pub use calculations::calculate_fit_dimensions;
pub use mock::{MockImageProcessor, RecordedOp};
pub use processor::ImageProcessor;

use crate::models::{Interpolation, OutputFormat};
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A single transform: read `source`, produce `width`x`height`, write `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub interpolation: Interpolation,
    pub format: OutputFormat,
}

#[async_trait]
pub trait ImageService: Send + Sync {
    /// Read the dimensions of the image at `source`.
    async fn dimensions(&self, source: &Path) -> Result<Dimensions>;

    /// Scale to exactly the requested size.
    async fn resize(&self, params: &TransformParams) -> Result<()>;

    /// Scale to fill the requested size, then centre-crop the overflow.
    async fn cover(&self, params: &TransformParams) -> Result<()>;
}
