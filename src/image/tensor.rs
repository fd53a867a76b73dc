//! Conversion of transformed images into model input batches.

use image::DynamicImage;
use ndarray::Array4;

use crate::error::{Error, Result};

use super::spec::ColorMode;
use super::ImageTensor;

/// Stack equally sized images into one NCHW batch.
///
/// Pixel values are converted to `f32` and multiplied by `rescale`
/// (`1.0 / 255.0` maps them into [0, 1]).
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the images do not all share the size of
/// the first one.
pub fn images_to_batch(images: &[DynamicImage], color_mode: ColorMode, rescale: f32) -> Result<ImageTensor> {
    let channels = color_mode.channels();
    let (width, height) = images
        .first()
        .map_or((0, 0), |img| (img.width() as usize, img.height() as usize));

    let mut batch = Array4::<f32>::zeros((images.len(), channels, height, width));

    for (n, img) in images.iter().enumerate() {
        if (img.width() as usize, img.height() as usize) != (width, height) {
            return Err(Error::ShapeMismatch {
                expected: format!("{width}x{height} image at batch position {n}"),
                actual: format!("{}x{}", img.width(), img.height()),
            });
        }

        let pixels = match color_mode {
            ColorMode::Grayscale => img.to_luma8().into_raw(),
            ColorMode::Rgb => img.to_rgb8().into_raw(),
            ColorMode::Rgba => img.to_rgba8().into_raw(),
        };

        // Interleaved HWC bytes into planar CHW
        for (i, chunk) in pixels.chunks_exact(channels).enumerate() {
            let (y, x) = (i / width, i % width);
            for (c, &value) in chunk.iter().enumerate() {
                batch[[n, c, y, x]] = f32::from(value) * rescale;
            }
        }
    }

    Ok(batch)
}
