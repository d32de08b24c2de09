mod identity;
mod metadata;

pub use identity::{Category, Identity, clean_id};
pub use metadata::{ImageRef, MetadataRecord, Provenance};
