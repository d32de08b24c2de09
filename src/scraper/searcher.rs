use crate::scraper::{
    Result, ScraperError,
    cache::ScraperCache,
    provider::{HttpRequest, Invoker, SourcePlugin, Transport, resolve_url},
    types::{Identity, ImageRef, MetadataRecord},
};
use chrono::Utc;
use rand::seq::IndexedRandom;
use reqwest::{StatusCode, Url};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Runs one plugin end to end: fetch through the page cache, decode,
/// resolve images through the image cache, then verify.
pub struct PluginSearcher {
    plugin: Arc<dyn SourcePlugin>,
    cache: Arc<ScraperCache>,
    transport: Arc<dyn Transport>,
    user_agent: String,
}

impl PluginSearcher {
    pub fn new(
        plugin: Arc<dyn SourcePlugin>,
        cache: Arc<ScraperCache>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let user_agent = USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or_default()
            .to_string();

        Self {
            plugin,
            cache,
            transport,
            user_agent,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.plugin.name()
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Search one identity. Soft misses, including failed verification,
    /// come back as [`ScraperError::NotFound`].
    pub async fn search(
        &self,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> Result<MetadataRecord> {
        let name = self.name();
        if !self.plugin.eligible(identity) {
            return Err(ScraperError::NotFound(format!(
                "{name} does not serve {}",
                identity.code()
            )));
        }

        let request = self.plugin.build_request(identity)?;
        let base = request.url.clone();
        let invoker = Invoker::new(self.transport.as_ref(), self.plugin.as_ref(), &self.user_agent);

        let key = format!("{name}:{}", identity.code());
        let response = self
            .cache
            .load_page(
                &key,
                cancel,
                || self.plugin.retrieve(&invoker, request, identity),
                |response| self.plugin.precheck_response(response),
            )
            .await?;

        if !self.plugin.precheck_response(&response) {
            return Err(ScraperError::NotFound(format!(
                "{name} has no page for {}",
                identity.code()
            )));
        }
        if response.status != StatusCode::OK {
            return Err(ScraperError::Api {
                status: response.status.as_u16(),
                message: format!("{name} returned an invalid page for {}", identity.code()),
            });
        }

        let mut record = self
            .plugin
            .decode(&response.body, identity)?
            .ok_or_else(|| {
                ScraperError::NotFound(format!("{name} found nothing for {}", identity.code()))
            })?;

        fix_record(&mut record, &base);
        self.resolve_images(&mut record, &invoker, cancel).await?;

        if let Err(reason) = record.verify() {
            debug!(plugin = name, code = identity.code(), reason, "verification failed");
            return Err(ScraperError::NotFound(format!(
                "{name} record for {} is incomplete: {reason}",
                identity.code()
            )));
        }

        record.stamp_provenance(name, Utc::now());
        Ok(record)
    }

    /// Replace every image URL with its content key; failed images are dropped.
    async fn resolve_images(
        &self,
        record: &mut MetadataRecord,
        invoker: &Invoker<'_>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for image in record.images_mut() {
            if image.name.is_empty() {
                continue;
            }

            let url = image.name.clone();
            let stored = self
                .cache
                .store_image(&url, cancel, || async {
                    let request = HttpRequest::get(&url)?;
                    let response = invoker.invoke_media(request).await?.error_for_status()?;
                    Ok::<_, ScraperError>(response.body)
                })
                .await;

            match stored {
                Ok(key) => image.key = key,
                Err(ScraperError::Cancelled) => return Err(ScraperError::Cancelled),
                Err(e) => {
                    warn!(plugin = self.name(), url = %url, "image fetch failed: {}", e);
                    image.key.clear();
                }
            }
        }

        if !record.cover.as_ref().is_some_and(ImageRef::is_resolved) {
            record.cover = None;
        }
        if !record.poster.as_ref().is_some_and(ImageRef::is_resolved) {
            record.poster = None;
        }
        record.sample_images.retain(ImageRef::is_resolved);
        Ok(())
    }
}

/// Upper-case the number and make image URLs absolute against the page URL
fn fix_record(record: &mut MetadataRecord, base: &Url) {
    record.number = record.number.to_uppercase();

    for image in record.images_mut() {
        if image.name.is_empty() {
            continue;
        }
        match resolve_url(base, &image.name) {
            Ok(url) => image.name = url.to_string(),
            Err(e) => {
                debug!(name = %image.name, "unresolvable image url: {}", e);
                image.name.clear();
            }
        }
    }
}
