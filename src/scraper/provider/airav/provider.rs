use super::api_types::{VideoResponse, VideoResult};
use crate::scraper::{
    Result, ScraperError,
    provider::{HttpRequest, ProviderConfig, SourcePlugin, parse_date},
    types::{Identity, ImageRef, MetadataRecord},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub const NAME: &str = "airav";

const AIRAV_BASE_URL: &str = "https://www.airav.wiki";

/// airav.wiki JSON API
pub struct AirAvProvider {
    config: ProviderConfig,
    base_url: String,
}

impl AirAvProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            base_url: config.base_url(AIRAV_BASE_URL),
            config,
        }
    }

    pub fn create(blob: &serde_json::Value) -> Result<Arc<dyn SourcePlugin>> {
        Ok(Arc::new(Self::new(ProviderConfig::from_blob(blob)?)))
    }

    fn video_to_record(video: VideoResult) -> MetadataRecord {
        let cover = (!video.img_url.is_empty()).then(|| ImageRef::new(video.img_url));

        MetadataRecord {
            number: video.barcode,
            title: video.name,
            plot: video.description,
            actors: video.actors.into_iter().map(|a| a.name).collect(),
            release_date: parse_date(&video.publish_date),
            studio: video
                .factories
                .into_iter()
                .next()
                .map(|f| f.name)
                .unwrap_or_default(),
            genres: video.tags.into_iter().map(|t| t.name).collect(),
            poster: cover.clone(),
            cover,
            sample_images: video.images.into_iter().map(ImageRef::new).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SourcePlugin for AirAvProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request(&self, identity: &Identity) -> Result<HttpRequest> {
        HttpRequest::get(&format!(
            "{}/api/video/barcode/{}?lng=zh-TW",
            self.base_url,
            urlencoding::encode(identity.code())
        ))
    }

    fn decorate_request(&self, request: &mut HttpRequest) -> Result<()> {
        self.config.apply_cookie(request)
    }

    fn decode(&self, body: &[u8], identity: &Identity) -> Result<Option<MetadataRecord>> {
        let response: VideoResponse = serde_json::from_slice(body)
            .map_err(|e| ScraperError::Parse(format!("JSON parse error: {e}")))?;

        if !response.status.eq_ignore_ascii_case("ok") {
            return Err(ScraperError::Parse(format!(
                "search result `{}`, not ok",
                response.status
            )));
        }
        if response.count == 0 {
            return Ok(None);
        }
        if response.count > 1 {
            warn!(
                code = identity.code(),
                count = response.count,
                "more than one result, data may not match"
            );
        }

        Ok(response.result.map(Self::video_to_record))
    }
}
