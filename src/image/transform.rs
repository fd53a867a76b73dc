//! Aspect-preserving resize followed by a center or random crop.

use image::{DynamicImage, GenericImageView};
use rand::Rng;

use crate::error::{Error, Result};

use super::load::{FsImageStore, ImageStore};
use super::spec::{CropFraction, CropPlacement, ImageSpec, Interpolation, TargetSize};

/// Turns an [`ImageSpec`] into an image of exactly the requested size.
#[derive(Debug, Clone, Default)]
pub struct ImageTransformer<S = FsImageStore> {
    store: S,
}

impl ImageTransformer<FsImageStore> {
    /// Transformer reading images from the filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(FsImageStore)
    }
}

impl<S: ImageStore> ImageTransformer<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the image described by `spec` and bring it to its target size.
    ///
    /// With no crop the image is resized straight to the target. Otherwise it
    /// is loaded at native size, scaled so both axes cover the pre-crop canvas
    /// and then cropped. `rng` is only drawn from for random crops.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is inconsistent or the image cannot be
    /// loaded. Spec validation happens before any I/O.
    pub fn transform<R: Rng + ?Sized>(&self, spec: &ImageSpec, rng: &mut R) -> Result<DynamicImage> {
        spec.validate()?;

        let Some(placement) = spec.crop.placement() else {
            return match spec.target_size {
                Some(size) => {
                    self.store
                        .load_resized(&spec.path, spec.color_mode, size, spec.interpolation)
                }
                None => self.store.load(&spec.path, spec.color_mode),
            };
        };

        let img = self.store.load(&spec.path, spec.color_mode)?;

        let Some(target) = spec.target_size else {
            return Ok(img);
        };
        if img.dimensions() == target.dimensions() {
            return Ok(img);
        }
        if img.width() == 0 || img.height() == 0 {
            return Err(Error::invalid(
                "image",
                format!("{} has a zero dimension", spec.path.display()),
            ));
        }

        tracing::trace!(
            "cropping {} from {}x{} to {target}",
            spec.path.display(),
            img.height(),
            img.width()
        );

        resize_and_crop(img, target, spec.interpolation, placement, spec.crop_fraction, rng)
    }
}

/// Scale `img` to cover the pre-crop canvas, then cut a `target` sized window.
///
/// # Errors
///
/// Returns an error if the scaled image would exceed [`MAX_RESIZED_PIXELS`].
pub fn resize_and_crop<R: Rng + ?Sized>(
    img: DynamicImage,
    target: TargetSize,
    interpolation: Interpolation,
    placement: CropPlacement,
    fraction: CropFraction,
    rng: &mut R,
) -> Result<DynamicImage> {
    let (width, height) = resized_dimensions(img.dimensions(), target, fraction)?;
    let resized = if img.dimensions() == (width, height) {
        img
    } else {
        img.resize_exact(width, height, interpolation.filter())
    };

    let (left, top) = match placement {
        CropPlacement::Center => (
            center_offset(width, target.width),
            center_offset(height, target.height),
        ),
        CropPlacement::Random => (
            random_offset(width, target.width, rng),
            random_offset(height, target.height, rng),
        ),
    };

    Ok(resized.crop_imm(left, top, target.width, target.height))
}

/// Largest intermediate image, in pixels, the crop path will allocate.
///
/// Very thin images need a huge upscale before their short side covers the
/// canvas; those are refused instead.
pub const MAX_RESIZED_PIXELS: u64 = 1 << 26;

/// Size of the canvas the crop is taken from, `(width, height)`.
#[must_use]
pub fn pre_crop_canvas(target: TargetSize, fraction: CropFraction) -> (f64, f64) {
    (
        f64::from(target.width) / fraction.get(),
        f64::from(target.height) / fraction.get(),
    )
}

/// Smallest aspect-preserving size of `native` (`(width, height)`) that covers
/// the pre-crop canvas on both axes.
///
/// Each axis is truncated to whole pixels and never ends up below the target.
///
/// # Errors
///
/// Returns an error if the result has more than [`MAX_RESIZED_PIXELS`] pixels.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn resized_dimensions(native: (u32, u32), target: TargetSize, fraction: CropFraction) -> Result<(u32, u32)> {
    let (width, height) = (f64::from(native.0), f64::from(native.1));
    let (canvas_w, canvas_h) = pre_crop_canvas(target, fraction);
    let ratio = (canvas_w / width).max(canvas_h / height);

    // float to int casts saturate
    let new_w = ((width * ratio) as u32).max(target.width);
    let new_h = ((height * ratio) as u32).max(target.height);

    let pixels = u64::from(new_w) * u64::from(new_h);
    if pixels > MAX_RESIZED_PIXELS {
        return Err(Error::invalid(
            "image",
            format!(
                "{}x{} would be scaled to {new_h}x{new_w}, over the {MAX_RESIZED_PIXELS} pixel limit",
                native.1, native.0
            ),
        ));
    }

    Ok((new_w, new_h))
}

/// Offset that centers a `target` long window on an axis of length `dim`.
///
/// Halves are rounded half to even; the result is clamped into the valid range.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn center_offset(dim: u32, target: u32) -> u32 {
    let offset = (f64::from(dim) / 2.0).round_ties_even() - (f64::from(target) / 2.0).round_ties_even();
    offset.clamp(0.0, f64::from(dim.saturating_sub(target))) as u32
}

/// Uniform offset in `[0, dim - target]`. Zero slack always yields 0.
pub fn random_offset<R: Rng + ?Sized>(dim: u32, target: u32, rng: &mut R) -> u32 {
    match dim.saturating_sub(target) {
        0 => 0,
        slack => rng.random_range(0..=slack),
    }
}
