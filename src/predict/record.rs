//! Prediction records and their split by orientation.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::image::image_dimensions;

/// Whether an image is wider than it is tall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Landscape when strictly wider than tall, portrait otherwise.
    #[must_use]
    pub const fn from_dimensions(width: u32, height: u32) -> Self {
        if width > height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }
}

/// One image to predict on, at position `index` of the caller's dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRecord {
    pub index: usize,
    pub image: PathBuf,
    pub is_landscape: bool,
}

impl PredictionRecord {
    pub fn new<P: Into<PathBuf>>(index: usize, image: P, is_landscape: bool) -> Self {
        Self {
            index,
            image: image.into(),
            is_landscape,
        }
    }

    /// Build a record whose orientation is read from the image header.
    ///
    /// # Errors
    ///
    /// Returns an error if the image header cannot be read.
    pub fn from_image_header<P: AsRef<Path>>(index: usize, image: P) -> Result<Self> {
        let image = image.as_ref();
        let (width, height) = image_dimensions(image)?;
        Ok(Self::new(
            index,
            image,
            Orientation::from_dimensions(width, height) == Orientation::Landscape,
        ))
    }

    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        if self.is_landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Records of a single orientation, in input order, with their original indices.
#[derive(Debug)]
pub struct Partition<'a> {
    pub orientation: Orientation,
    pub records: Vec<&'a PredictionRecord>,
}

impl Partition<'_> {
    fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            records: Vec::new(),
        }
    }

    /// Original indices, row `i` of this partition maps to `indices()[i]`.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.records.iter().map(|r| r.index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Split `records` into landscape and portrait partitions.
///
/// Every index must be below `records.len()` and appear once, so that the two
/// partitions together cover `[0, N)` exactly.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] on an out-of-range or repeated index.
pub fn partition(records: &[PredictionRecord]) -> Result<(Partition<'_>, Partition<'_>)> {
    let mut seen = vec![false; records.len()];
    let mut landscape = Partition::new(Orientation::Landscape);
    let mut portrait = Partition::new(Orientation::Portrait);

    for record in records {
        match seen.get_mut(record.index) {
            None => {
                return Err(Error::invalid(
                    "records",
                    format!("index {} is out of range for {} records", record.index, records.len()),
                ))
            }
            Some(true) => {
                return Err(Error::invalid(
                    "records",
                    format!("index {} appears more than once", record.index),
                ))
            }
            Some(slot) => *slot = true,
        }

        match record.orientation() {
            Orientation::Landscape => landscape.records.push(record),
            Orientation::Portrait => portrait.records.push(record),
        }
    }

    Ok((landscape, portrait))
}
