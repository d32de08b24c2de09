use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image reference: the source URL and, once resolved, its cache content key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub name: String,
    pub key: String,
}

impl ImageRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: String::new(),
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.name.is_empty() && !self.key.is_empty()
    }
}

/// Where and when a record was scraped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: String,
    pub retrieved_at: DateTime<Utc>,
}

/// Metadata for one release as decoded from a source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// The source's echo of the code
    pub number: String,
    pub title: String,
    pub plot: String,
    pub actors: Vec<String>,
    /// Unix seconds
    pub release_date: i64,
    /// Seconds
    pub duration: i64,
    pub studio: String,
    pub label: String,
    pub series: String,
    pub director: String,
    pub genres: Vec<String>,
    pub cover: Option<ImageRef>,
    pub poster: Option<ImageRef>,
    /// Order is significant, exporters number the files by position
    pub sample_images: Vec<ImageRef>,
    pub(crate) provenance: Option<Provenance>,
}

impl MetadataRecord {
    #[must_use]
    pub const fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    /// Record the source once; later calls keep the first stamp
    pub fn stamp_provenance(&mut self, source: &str, retrieved_at: DateTime<Utc>) {
        if self.provenance.is_none() {
            self.provenance = Some(Provenance {
                source: source.to_string(),
                retrieved_at,
            });
        }
    }

    /// Structural completeness check, the reason is returned on failure
    pub fn verify(&self) -> Result<(), &'static str> {
        if self.title.is_empty() {
            return Err("no title");
        }
        if self.number.is_empty() {
            return Err("no number");
        }
        if self.release_date == 0 {
            return Err("no release date");
        }
        if !self.cover.as_ref().is_some_and(ImageRef::is_resolved) {
            return Err("invalid cover");
        }
        if !self.poster.as_ref().is_some_and(ImageRef::is_resolved) {
            return Err("invalid poster");
        }
        Ok(())
    }

    /// Whether the record passes [`MetadataRecord::verify`]
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verify().is_ok()
    }

    /// Mutable access to every image reference, cover and poster first
    pub fn images_mut(&mut self) -> impl Iterator<Item = &mut ImageRef> {
        self.cover
            .iter_mut()
            .chain(self.poster.iter_mut())
            .chain(self.sample_images.iter_mut())
    }
}
