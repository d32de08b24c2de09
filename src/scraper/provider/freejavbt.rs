use super::{Field, HtmlDecoder, HttpRequest, ProviderConfig, SourcePlugin};
use crate::scraper::{
    Result,
    types::{Identity, MetadataRecord},
};
use async_trait::async_trait;
use std::sync::Arc;

pub const NAME: &str = "freejavbt";

const FREEJAVBT_BASE_URL: &str = "https://freejavbt.com";
const INFO: &str = "div > span";

/// freejavbt.com: the detail page is addressed by code directly
pub struct FreeJavBtProvider {
    config: ProviderConfig,
    base_url: String,
    decoder: HtmlDecoder,
}

impl FreeJavBtProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let decoder = HtmlDecoder::builder()
            .field(Field::Title, "h1.text-white strong")
            .labelled(Field::Actors, INFO, "女优", "div a")
            .labelled(Field::ReleaseDate, INFO, "日期", "span:nth-of-type(2)")
            .labelled(Field::Duration, INFO, "时长", "span:nth-of-type(2)")
            .labelled(Field::Studio, INFO, "制作", "a")
            .labelled(Field::Director, INFO, "导演", "a")
            .labelled(Field::Genres, INFO, "类别", "div a")
            .field(Field::Cover, "img.video-cover@data-src")
            .field(Field::SampleImages, "div.preview a img@data-src")
            .build()?;

        Ok(Self {
            base_url: config.base_url(FREEJAVBT_BASE_URL),
            config,
            decoder,
        })
    }

    pub fn create(blob: &serde_json::Value) -> Result<Arc<dyn SourcePlugin>> {
        Ok(Arc::new(Self::new(ProviderConfig::from_blob(blob)?)?))
    }
}

#[async_trait]
impl SourcePlugin for FreeJavBtProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request(&self, identity: &Identity) -> Result<HttpRequest> {
        HttpRequest::get(&format!(
            "{}/zh/{}",
            self.base_url,
            urlencoding::encode(identity.code())
        ))
    }

    fn decorate_request(&self, request: &mut HttpRequest) -> Result<()> {
        self.config.apply_cookie(request)
    }

    fn decode(&self, body: &[u8], identity: &Identity) -> Result<Option<MetadataRecord>> {
        let mut record = self.decoder.decode(body);
        if record.title.is_empty() {
            return Ok(None);
        }
        record.number = identity.code().to_string();
        Ok(Some(record))
    }
}
