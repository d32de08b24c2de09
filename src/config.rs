//! Application configuration.
//!
//! Loaded from an optional file (format picked from the extension, TOML or
//! JSON) layered under `AVCAP_`-prefixed environment variables, e.g.
//! `AVCAP_SCAN_DIR` or `AVCAP_NETWORK__TIMEOUT_SECS`.

use crate::scraper::{NoiseRule, PAGE_CACHE_TTL, Result, ScraperError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Override chain for one category label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPlugins {
    pub name: String,
    pub plugins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    pub proxy: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            proxy: None,
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enable_page_cache: bool,
    pub page_ttl_days: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_page_cache: true,
            page_ttl_days: PAGE_CACHE_TTL.as_secs() / 86_400,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_days * 86_400)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Directory for daily-rolling log files; console only when unset
    pub file: Option<PathBuf>,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scan_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Default chain, tried in order
    pub plugins: Vec<String>,
    pub category_plugins: Vec<CategoryPlugins>,
    /// Opaque per-plugin blobs handed to the plugin constructors
    pub plugin_config: HashMap<String, serde_json::Value>,
    /// `[pattern, replacement]` pairs applied before code extraction
    pub regexes_to_replace: Vec<Vec<String>>,
    pub extra_media_exts: Vec<String>,
    pub network: NetworkConfig,
    pub cache: CacheConfig,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan_dir: PathBuf::from("."),
            data_dir: dirs::data_dir()
                .map(|d| d.join("avcap"))
                .unwrap_or_else(|| PathBuf::from("./data")),
            plugins: [
                "airav",
                "javdb",
                "jav321",
                "18av",
                "njav",
                "freejavbt",
                "tktube",
                "avsox",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            category_plugins: vec![CategoryPlugins {
                name: "FC2".to_string(),
                plugins: ["18av", "njav", "freejavbt", "tktube", "avsox", "fc2ppvdb"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            }],
            plugin_config: HashMap::new(),
            regexes_to_replace: Vec::new(),
            extra_media_exts: Vec::new(),
            network: NetworkConfig::default(),
            cache: CacheConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path` (if given) and the environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("AVCAP")
                .prefix_separator("_")
                .separator("__"),
        );

        let config: Self = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ScraperError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without the plugin registry
    pub fn validate(&self) -> Result<()> {
        self.noise_rules()?;

        if self.plugins.is_empty() {
            return Err(ScraperError::Config("default plugin chain is empty".to_string()));
        }
        for category in &self.category_plugins {
            if category.name.trim().is_empty() {
                return Err(ScraperError::Config("empty category label".to_string()));
            }
            if category.plugins.is_empty() {
                return Err(ScraperError::Config(format!(
                    "plugin chain for category {} is empty",
                    category.name
                )));
            }
        }
        if self.network.timeout_secs == 0 {
            return Err(ScraperError::Config("network timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn noise_rules(&self) -> Result<Vec<NoiseRule>> {
        NoiseRule::from_pairs(&self.regexes_to_replace)
    }

    /// Category chains as `(label, plugins)` pairs, in configured order
    #[must_use]
    pub fn category_chains(&self) -> Vec<(String, Vec<String>)> {
        self.category_plugins
            .iter()
            .map(|c| (c.name.clone(), c.plugins.clone()))
            .collect()
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }
}
