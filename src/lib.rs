//! Identify adult-video releases from file names and scrape verified
//! metadata through category-aware chains of cached source plugins.

pub mod config;
pub mod logging;
pub mod scraper;
pub mod services;
