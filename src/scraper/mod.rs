mod cache;
mod category;
mod manager;
mod parser;
pub mod provider;
mod reconciler;
mod scanner;
mod searcher;
mod types;

#[cfg(test)]
mod tests;

pub use cache::{CacheStore, DiskStore, MemoryStore, ScraperCache, image_key};
pub use category::Classifier;
pub use manager::{CategoryRouter, ScrapeResult};
pub use parser::{NoiseRule, Parser};
pub use provider::{
    HtmlDecoder, HttpClient, HttpRequest, HttpResponse, Invoker, PluginCreator, PluginRegistry,
    SourcePlugin, Transport,
};
pub use reconciler::{FileContext, reconcile};
pub use scanner::Scanner;
pub use searcher::PluginSearcher;
pub use types::{Category, Identity, ImageRef, MetadataRecord, Provenance};

use std::time::Duration;

/// Fixed expiry of cached search pages
pub const PAGE_CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Scraper result type
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Scraper error types
#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ScraperError {
    /// Soft failures move the chain on to the next plugin without being recorded
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
