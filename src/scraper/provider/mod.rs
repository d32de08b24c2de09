mod decoder;
mod http;
mod traits;
mod twostep;

pub mod airav;
pub mod av18;
pub mod avsox;
pub mod fc2ppvdb;
pub mod freejavbt;
pub mod jav321;
pub mod javdb;
pub mod njav;
pub mod tktube;

pub use airav::AirAvProvider;
pub use av18::Av18Provider;
pub use avsox::AvsoxProvider;
pub use decoder::{DecoderBuilder, Expr, Field, HtmlDecoder, parse_date, parse_duration};
pub use fc2ppvdb::Fc2PpvDbProvider;
pub use freejavbt::FreeJavBtProvider;
pub use http::{HttpClient, HttpRequest, HttpResponse, Transport};
pub use jav321::Jav321Provider;
pub use javdb::JavDbProvider;
pub use njav::NjavProvider;
pub use tktube::TkTubeProvider;
pub use traits::{Invoker, SourcePlugin, apply_default_headers};
pub use twostep::{TitleMatch, TwoStep, resolve_url};

use crate::scraper::{Result, ScraperError};
use reqwest::header::COOKIE;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-plugin configuration read from the opaque config blob
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Override of the site's base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Raw `Cookie` header attached to page requests
    #[serde(default)]
    pub cookie: Option<String>,
}

impl ProviderConfig {
    /// Parse a blob; `null` means defaults
    pub fn from_blob(blob: &serde_json::Value) -> Result<Self> {
        if blob.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(blob.clone())
            .map_err(|e| ScraperError::Config(format!("invalid plugin config: {e}")))
    }

    /// Configured base URL or the site default, without a trailing slash
    #[must_use]
    pub fn base_url(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn apply_cookie(&self, request: &mut HttpRequest) -> Result<()> {
        match self.cookie.as_deref().filter(|c| !c.is_empty()) {
            Some(cookie) => request.set_header(COOKIE, cookie),
            None => Ok(()),
        }
    }
}

/// Builds a plugin from its configuration blob
pub type PluginCreator = fn(&serde_json::Value) -> Result<Arc<dyn SourcePlugin>>;

/// Explicit name to constructor map, built once at startup
#[derive(Clone, Default)]
pub struct PluginRegistry {
    creators: BTreeMap<&'static str, PluginCreator>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in source
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(airav::NAME, AirAvProvider::create);
        registry.register(av18::NAME, Av18Provider::create);
        registry.register(avsox::NAME, AvsoxProvider::create);
        registry.register(fc2ppvdb::NAME, Fc2PpvDbProvider::create);
        registry.register(freejavbt::NAME, FreeJavBtProvider::create);
        registry.register(jav321::NAME, Jav321Provider::create);
        registry.register(javdb::NAME, JavDbProvider::create);
        registry.register(njav::NAME, NjavProvider::create);
        registry.register(tktube::NAME, TkTubeProvider::create);
        registry
    }

    pub fn register(&mut self, name: &'static str, creator: PluginCreator) {
        self.creators.insert(name, creator);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.creators.keys().copied()
    }

    /// Instantiate a plugin; unknown names are a configuration error
    pub fn create(&self, name: &str, blob: &serde_json::Value) -> Result<Arc<dyn SourcePlugin>> {
        let creator = self
            .creators
            .get(name)
            .ok_or_else(|| ScraperError::Config(format!("unknown plugin `{name}`")))?;
        creator(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_config_blob() {
        let config = ProviderConfig::from_blob(&json!({
            "base_url": "https://mirror.example/",
            "cookie": "over18=1"
        }))
        .unwrap();
        assert_eq!(config.base_url("https://default.example"), "https://mirror.example");

        let mut request = HttpRequest::get("https://mirror.example/").unwrap();
        config.apply_cookie(&mut request).unwrap();
        assert_eq!(request.headers[COOKIE], "over18=1");

        let defaults = ProviderConfig::from_blob(&serde_json::Value::Null).unwrap();
        assert_eq!(defaults.base_url("https://default.example"), "https://default.example");

        assert!(ProviderConfig::from_blob(&json!({"cookie": 5})).is_err());
    }

    #[test]
    fn test_registry_defaults() {
        let registry = PluginRegistry::with_defaults();
        for name in [
            "18av",
            "airav",
            "avsox",
            "fc2ppvdb",
            "freejavbt",
            "jav321",
            "javdb",
            "njav",
            "tktube",
        ] {
            let plugin = registry.create(name, &serde_json::Value::Null).unwrap();
            assert_eq!(plugin.name(), name);
        }

        assert!(matches!(
            registry.create("javbus", &serde_json::Value::Null),
            Err(ScraperError::Config(_))
        ));
    }
}
