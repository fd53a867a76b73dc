//! Image loading utilities.

use std::path::Path;

use image::DynamicImage;

use crate::error::{Error, Result};

use super::spec::{ColorMode, Interpolation, TargetSize};

/// Source of decoded images.
///
/// The transformer only ever asks for an image at native size or resized
/// straight to a target size, so a store can be backed by anything from the
/// filesystem to an in-memory cache. Stores are shared between the threads
/// that prepare a batch.
pub trait ImageStore: Sync {
    /// Load an image at its native resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read or decoded.
    fn load(&self, path: &Path, color_mode: ColorMode) -> Result<DynamicImage>;

    /// Load an image resized to exactly `size`, ignoring aspect ratio.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read or decoded.
    fn load_resized(
        &self,
        path: &Path,
        color_mode: ColorMode,
        size: TargetSize,
        interpolation: Interpolation,
    ) -> Result<DynamicImage> {
        let img = self.load(path, color_mode)?;
        Ok(resize_exact(img, size, interpolation))
    }
}

/// Reads images from disk with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageStore;

impl ImageStore for FsImageStore {
    fn load(&self, path: &Path, color_mode: ColorMode) -> Result<DynamicImage> {
        let img = image::open(path).map_err(|source| Error::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(convert_color(img, color_mode))
    }
}

/// Read only the dimensions of an image, `(width, height)`, from its header.
///
/// # Errors
///
/// Returns an error if the header cannot be read.
pub fn image_dimensions<P: AsRef<Path>>(path: P) -> Result<(u32, u32)> {
    let path = path.as_ref();
    image::image_dimensions(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert a decoded image to the requested pixel format.
#[must_use]
pub fn convert_color(img: DynamicImage, color_mode: ColorMode) -> DynamicImage {
    match (color_mode, img) {
        (ColorMode::Grayscale, img @ DynamicImage::ImageLuma8(_))
        | (ColorMode::Rgb, img @ DynamicImage::ImageRgb8(_))
        | (ColorMode::Rgba, img @ DynamicImage::ImageRgba8(_)) => img,
        (ColorMode::Grayscale, img) => DynamicImage::ImageLuma8(img.to_luma8()),
        (ColorMode::Rgb, img) => DynamicImage::ImageRgb8(img.to_rgb8()),
        (ColorMode::Rgba, img) => DynamicImage::ImageRgba8(img.to_rgba8()),
    }
}

/// Resize to exactly `size` unless the image already has that size.
#[must_use]
pub fn resize_exact(img: DynamicImage, size: TargetSize, interpolation: Interpolation) -> DynamicImage {
    let (width, height) = size.dimensions();
    if img.width() == width && img.height() == height {
        return img;
    }
    img.resize_exact(width, height, interpolation.filter())
}
