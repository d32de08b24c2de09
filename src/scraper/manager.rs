use crate::scraper::{
    Result, ScraperError,
    cache::ScraperCache,
    provider::{PluginRegistry, Transport},
    searcher::PluginSearcher,
    types::{Category, Identity, MetadataRecord},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Verified record and the plugin that produced it
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub record: MetadataRecord,
    pub source: &'static str,
}

/// Picks a plugin chain for an identity and runs it, first success wins
pub struct CategoryRouter {
    default_chain: Vec<Arc<PluginSearcher>>,
    category_chains: HashMap<Category, Vec<Arc<PluginSearcher>>>,
}

impl CategoryRouter {
    pub fn new(default_chain: Vec<Arc<PluginSearcher>>) -> Self {
        Self {
            default_chain,
            category_chains: HashMap::new(),
        }
    }

    /// Add or replace the chain for a category label
    #[must_use]
    pub fn with_category(
        mut self,
        category: impl Into<Category>,
        chain: Vec<Arc<PluginSearcher>>,
    ) -> Self {
        self.category_chains.insert(category.into(), chain);
        self
    }

    /// Build every chain from plugin names.
    ///
    /// Each plugin is created once and shared between chains. Unknown
    /// names, empty labels and empty chains are configuration errors.
    pub fn from_config(
        registry: &PluginRegistry,
        default_plugins: &[String],
        category_plugins: &[(String, Vec<String>)],
        plugin_config: &HashMap<String, Value>,
        cache: Arc<ScraperCache>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let mut searchers: HashMap<String, Arc<PluginSearcher>> = HashMap::new();
        let mut build_chain = |names: &[String]| -> Result<Vec<Arc<PluginSearcher>>> {
            if names.is_empty() {
                return Err(ScraperError::Config("plugin chain is empty".to_string()));
            }
            names
                .iter()
                .map(|name| {
                    if let Some(searcher) = searchers.get(name) {
                        return Ok(searcher.clone());
                    }
                    let blob = plugin_config.get(name).unwrap_or(&Value::Null);
                    let plugin = registry.create(name, blob)?;
                    let searcher = Arc::new(PluginSearcher::new(
                        plugin,
                        cache.clone(),
                        transport.clone(),
                    ));
                    searchers.insert(name.clone(), searcher.clone());
                    Ok(searcher)
                })
                .collect()
        };

        let default_chain = build_chain(default_plugins)?;
        let mut router = Self::new(default_chain);

        for (label, names) in category_plugins {
            if label.trim().is_empty() {
                return Err(ScraperError::Config("empty category label".to_string()));
            }
            let chain = build_chain(names).map_err(|e| match e {
                ScraperError::Config(msg) => ScraperError::Config(format!("category {label}: {msg}")),
                other => other,
            })?;
            router = router.with_category(label.as_str(), chain);
        }

        info!(
            default = default_plugins.len(),
            categories = router.category_chains.len(),
            "plugin chains ready"
        );
        Ok(router)
    }

    /// The chain for the first category label, in sorted order, that has
    /// one; otherwise the default chain
    #[must_use]
    pub fn chain_for(&self, identity: &Identity) -> &[Arc<PluginSearcher>] {
        identity
            .category()
            .iter()
            .find_map(|category| self.category_chains.get(category))
            .unwrap_or(&self.default_chain)
    }

    /// Run the chain in order and return the first verified record.
    ///
    /// Not-found results move on silently. Hard errors are logged and the
    /// last one is returned if no plugin succeeds.
    pub async fn search(
        &self,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> Result<ScrapeResult> {
        if !identity.is_resolved() {
            return Err(ScraperError::NotFound("no code extracted".to_string()));
        }

        let mut last_err = None;
        for searcher in self.chain_for(identity) {
            if cancel.is_cancelled() {
                return Err(ScraperError::Cancelled);
            }

            match searcher.search(identity, cancel).await {
                Ok(record) => {
                    info!(plugin = searcher.name(), code = identity.code(), "metadata found");
                    return Ok(ScrapeResult {
                        record,
                        source: searcher.name(),
                    });
                }
                Err(ScraperError::Cancelled) => return Err(ScraperError::Cancelled),
                Err(e) if e.is_not_found() => {
                    debug!(plugin = searcher.name(), code = identity.code(), "{}", e);
                }
                Err(e) => {
                    warn!(plugin = searcher.name(), code = identity.code(), "search failed: {}", e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ScraperError::NotFound(format!("no plugin found {}", identity.code()))
        }))
    }
}
