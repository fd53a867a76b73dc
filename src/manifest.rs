//! JSON dataset manifests.
//!
//! Two layouts are accepted:
//!
//! - a list of entries, `[{"filename": "a.jpg", "landscape": true}, ...]`
//! - the downloader's keyed layout, `{"<id>": {"URL": "https://.../a.jpg"}, ...}`,
//!   where the file is expected under the URL's last path segment. Keyed
//!   entries keep their order in the file.
//!
//! Entries without `landscape` get their orientation from the image header.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::predict::PredictionRecord;

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default, rename = "URL", alias = "url")]
    pub url: Option<String>,

    #[serde(default)]
    pub landscape: Option<bool>,
}

impl ManifestEntry {
    /// File name of the image relative to the image directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry has neither a file name nor a URL ending
    /// in one.
    pub fn file_name(&self) -> Result<&str> {
        if let Some(filename) = self.filename.as_deref() {
            return Ok(filename);
        }

        self.url
            .as_deref()
            .and_then(url_basename)
            .ok_or_else(|| Error::invalid("manifest", format!("entry {self:?} has no filename or URL")))
    }
}

/// Last non-empty path segment of a URL, ignoring query and fragment.
fn url_basename(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Layout {
    List(Vec<ManifestEntry>),
    Keyed(serde_json::Map<String, serde_json::Value>),
}

/// A parsed manifest, entries in dataset order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Read a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|source| Error::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse manifest JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a manifest in either layout.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let entries = match serde_json::from_str::<Layout>(text)? {
            Layout::List(entries) => entries,
            Layout::Keyed(entries) => entries
                .into_iter()
                .map(|(_, entry)| serde_json::from_value(entry))
                .collect::<serde_json::Result<_>>()?,
        };
        Ok(Self { entries })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Image paths under `image_dir`, in dataset order.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry names no file.
    pub fn image_paths<P: AsRef<Path>>(&self, image_dir: P) -> Result<Vec<PathBuf>> {
        let image_dir = image_dir.as_ref();
        self.entries
            .iter()
            .map(|entry| -> Result<PathBuf> { Ok(image_dir.join(entry.file_name()?)) })
            .collect()
    }

    /// One record per entry, indexed by manifest position.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry names no file, or its orientation has to
    /// be read from an image header that cannot be read.
    pub fn records<P: AsRef<Path>>(&self, image_dir: P) -> Result<Vec<PredictionRecord>> {
        let paths = self.image_paths(image_dir)?;
        self.entries
            .iter()
            .zip(paths)
            .enumerate()
            .map(|(index, (entry, path))| match entry.landscape {
                Some(landscape) => Ok(PredictionRecord::new(index, path, landscape)),
                None => PredictionRecord::from_image_header(index, path),
            })
            .collect()
    }
}
