//! In-memory image store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;

use crate::error::{Error, Result};

use super::load::{convert_color, resize_exact, ImageStore};
use super::spec::{ColorMode, Interpolation, TargetSize};

/// Serves already decoded images keyed by path.
///
/// Keeps a count of native and resized loads, which makes it handy for
/// checking which loading path a transform took.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: HashMap<PathBuf, DynamicImage>,
    native_loads: AtomicUsize,
    resized_loads: AtomicUsize,
}

impl MemoryImageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<PathBuf>>(&mut self, path: P, img: DynamicImage) {
        self.images.insert(path.into(), img);
    }

    #[must_use]
    pub fn with<P: Into<PathBuf>>(mut self, path: P, img: DynamicImage) -> Self {
        self.insert(path, img);
        self
    }

    /// Number of [`ImageStore::load`] calls served so far.
    pub fn native_loads(&self) -> usize {
        self.native_loads.load(Ordering::Relaxed)
    }

    /// Number of [`ImageStore::load_resized`] calls served so far.
    pub fn resized_loads(&self) -> usize {
        self.resized_loads.load(Ordering::Relaxed)
    }

    fn get(&self, path: &Path) -> Result<DynamicImage> {
        self.images.get(path).cloned().ok_or_else(|| Error::ImageLoad {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(std::io::ErrorKind::NotFound.into()),
        })
    }
}

impl ImageStore for MemoryImageStore {
    fn load(&self, path: &Path, color_mode: ColorMode) -> Result<DynamicImage> {
        self.native_loads.fetch_add(1, Ordering::Relaxed);
        Ok(convert_color(self.get(path)?, color_mode))
    }

    fn load_resized(
        &self,
        path: &Path,
        color_mode: ColorMode,
        size: TargetSize,
        interpolation: Interpolation,
    ) -> Result<DynamicImage> {
        self.resized_loads.fetch_add(1, Ordering::Relaxed);
        Ok(resize_exact(convert_color(self.get(path)?, color_mode), size, interpolation))
    }
}
