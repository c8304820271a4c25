use std::path::Path;

use anyhow::Context;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::UpscaleError;

#[derive(Debug)]
pub struct SourceImage {
    pub image: DynamicImage,
    /// Detected from the file contents, not the extension.
    pub format: Option<ImageFormat>,
}

/// Decodes `path`. A file that is missing or cannot be decoded is reported
/// as not found.
pub fn read_image(path: &Path) -> Result<SourceImage, UpscaleError> {
    let not_found = || UpscaleError::FileNotFound(path.to_path_buf());
    if !path.is_file() {
        return Err(not_found());
    }

    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| {
            tracing::warn!("Failed to open image {}: {e}", path.display());
            not_found()
        })?;
    let format = reader.format();
    let image = reader.decode().map_err(|e| {
        tracing::warn!("Failed to decode image {}: {e}", path.display());
        not_found()
    })?;

    tracing::debug!(
        "Read {}x{} {:?} image from {}",
        image.width(),
        image.height(),
        image.color(),
        path.display()
    );
    Ok(SourceImage { image, format })
}

/// Picks the output format from the extension of `path`, then `fallback`,
/// then PNG.
pub fn output_format(path: &Path, fallback: Option<ImageFormat>) -> ImageFormat {
    ImageFormat::from_path(path)
        .ok()
        .filter(ImageFormat::can_write)
        .or(fallback.filter(ImageFormat::can_write))
        .unwrap_or(ImageFormat::Png)
}

/// Encodes `image` to `path`, creating missing parent directories.
pub fn write_image(
    image: &DynamicImage,
    path: &Path,
    fallback: Option<ImageFormat>,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let format = output_format(path, fallback);
    let converted;
    let image = match format {
        // no alpha and no 16-bit samples in JPEG
        ImageFormat::Jpeg if !matches!(image, DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_)) => {
            converted = DynamicImage::ImageRgb8(image.to_rgb8());
            &converted
        }
        _ => image,
    };

    image
        .save_with_format(path, format)
        .with_context(|| format!("Failed to save image to {}", path.display()))?;
    tracing::debug!("Wrote {:?} to {}", format, path.display());
    Ok(())
}
