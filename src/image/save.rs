//! Image saving utilities.

use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};

/// Save a transformed image, inferring the format from the extension.
///
/// JPEG output is encoded with `quality` (1-100) and drops any alpha channel;
/// other formats ignore `quality`. A path without a recognised extension is
/// written as PNG.
///
/// # Errors
///
/// Returns an error if the image cannot be saved.
pub fn save_image<P: AsRef<Path>>(img: &DynamicImage, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();
    let to_save_error = |source| Error::ImageSave {
        path: path.to_path_buf(),
        source,
    };

    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Jpeg) => {
            let mut output = std::fs::File::create(path)?;
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            let img = match img {
                DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img.clone(),
                _ => DynamicImage::ImageRgb8(img.to_rgb8()),
            };
            img.write_with_encoder(encoder).map_err(to_save_error)?;
        }
        Ok(_) => img.save(path).map_err(to_save_error)?,
        Err(_) => img
            .save_with_format(path, ImageFormat::Png)
            .map_err(to_save_error)?,
    }

    Ok(())
}
