use super::{Dimensions, ImageService, TransformParams};
use crate::models::OutputFormat;
use crate::{Error, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageError, ImageReader};
use std::path::{Path, PathBuf};

/// [`ImageService`] backed by the `image` crate.
///
/// Decoding sniffs the file contents, so uploads stored without a matching
/// extension still open. All pixel work runs on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    fn open(path: &Path) -> Result<DynamicImage> {
        let image = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(ImageError::IoError)?
            .decode()?;
        Ok(image)
    }

    fn read_dimensions_sync(path: PathBuf) -> Result<Dimensions> {
        let (width, height) = ImageReader::open(&path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(ImageError::IoError)?
            .into_dimensions()?;
        Ok(Dimensions::new(width, height))
    }

    fn resize_sync(params: TransformParams) -> Result<()> {
        let image = Self::open(&params.source)?;
        let resized = image.resize_exact(
            params.width,
            params.height,
            params.interpolation.filter_type(),
        );
        Self::save(resized, &params)
    }

    fn cover_sync(params: TransformParams) -> Result<()> {
        let image = Self::open(&params.source)?;
        let covered = image.resize_to_fill(
            params.width,
            params.height,
            params.interpolation.filter_type(),
        );
        Self::save(covered, &params)
    }

    fn save(image: DynamicImage, params: &TransformParams) -> Result<()> {
        encodable(image, params.format)
            .save_with_format(&params.output, params.format.image_format())?;
        Ok(())
    }

    async fn run_blocking<T, F>(task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(task)
            .await
            .map_err(|e| Error::Invariant(format!("Image processing task join error: {}", e)))?
    }
}

/// Convert to a pixel layout the target encoder accepts.
fn encodable(image: DynamicImage, format: OutputFormat) -> DynamicImage {
    let accepted = match format {
        OutputFormat::Png => true,
        OutputFormat::Jpg => matches!(
            image,
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_)
        ),
        _ => matches!(
            image,
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_)
        ),
    };

    if accepted {
        image
    } else if format == OutputFormat::Jpg {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        DynamicImage::ImageRgba8(image.to_rgba8())
    }
}

#[async_trait]
impl ImageService for ImageProcessor {
    async fn dimensions(&self, source: &Path) -> Result<Dimensions> {
        let source = source.to_path_buf();
        Self::run_blocking(move || Self::read_dimensions_sync(source)).await
    }

    async fn resize(&self, params: &TransformParams) -> Result<()> {
        let params = params.clone();
        Self::run_blocking(move || Self::resize_sync(params)).await
    }

    async fn cover(&self, params: &TransformParams) -> Result<()> {
        let params = params.clone();
        Self::run_blocking(move || Self::cover_sync(params)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Interpolation;
    use image::ImageFormat;
    use tempfile::TempDir;

    fn write_test_image(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.path().join(name);
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    fn params(source: PathBuf, output: PathBuf, width: u32, height: u32) -> TransformParams {
        TransformParams {
            source,
            output,
            width,
            height,
            interpolation: Interpolation::Linear,
            format: OutputFormat::Png,
        }
    }

    #[tokio::test]
    async fn test_dimensions() {
        let dir = TempDir::new().unwrap();
        let source = write_test_image(&dir, "wide.png", 40, 20);

        let dims = ImageProcessor::new().dimensions(&source).await.unwrap();
        assert_eq!(dims, Dimensions::new(40, 20));
    }

    #[tokio::test]
    async fn test_dimensions_without_extension() {
        let dir = TempDir::new().unwrap();
        let source = write_test_image(&dir, "upload-without-ext", 12, 7);

        let dims = ImageProcessor::new().dimensions(&source).await.unwrap();
        assert_eq!(dims, Dimensions::new(12, 7));
    }

    #[tokio::test]
    async fn test_resize_is_exact() {
        let dir = TempDir::new().unwrap();
        let source = write_test_image(&dir, "wide.png", 40, 20);
        let output = dir.path().join("wide_resized.png");

        ImageProcessor::new()
            .resize(&params(source, output.clone(), 10, 5))
            .await
            .unwrap();

        let resized = image::open(&output).unwrap();
        assert_eq!((resized.width(), resized.height()), (10, 5));
    }

    #[tokio::test]
    async fn test_cover_fills_target_regardless_of_aspect() {
        let dir = TempDir::new().unwrap();
        let source = write_test_image(&dir, "wide.png", 40, 20);
        let output = dir.path().join("wide_cover.png");

        ImageProcessor::new()
            .cover(&params(source, output.clone(), 15, 15))
            .await
            .unwrap();

        let covered = image::open(&output).unwrap();
        assert_eq!((covered.width(), covered.height()), (15, 15));
    }

    #[tokio::test]
    async fn test_jpeg_output_from_rgba_source() {
        let dir = TempDir::new().unwrap();
        let source = write_test_image(&dir, "alpha.png", 16, 16);
        let output = dir.path().join("alpha_x.jpg");

        let mut jpeg = params(source, output.clone(), 8, 8);
        jpeg.format = OutputFormat::Jpg;
        ImageProcessor::new().cover(&jpeg).await.unwrap();

        let format = ImageReader::open(&output)
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .format();
        assert_eq!(format, Some(ImageFormat::Jpeg));
    }

    #[tokio::test]
    async fn test_undecodable_source_is_image_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.png");
        std::fs::write(&source, b"definitely not a png").unwrap();

        let result = ImageProcessor::new()
            .cover(&params(source, dir.path().join("out.png"), 4, 4))
            .await;
        assert!(matches!(result, Err(Error::Image(_))));
    }

    #[tokio::test]
    async fn test_missing_source_is_image_error() {
        let dir = TempDir::new().unwrap();

        let result = ImageProcessor::new()
            .dimensions(&dir.path().join("missing.png"))
            .await;
        assert!(matches!(result, Err(Error::Image(ImageError::IoError(_)))));
    }

    #[tokio::test]
    async fn test_unwritable_destination_fails() {
        let dir = TempDir::new().unwrap();
        let source = write_test_image(&dir, "ok.png", 4, 4);
        let output = dir.path().join("no-such-dir").join("ok_cover.png");

        let result = ImageProcessor::new()
            .cover(&params(source, output, 2, 2))
            .await;
        assert!(result.is_err());
    }
}
