use super::{Field, HtmlDecoder, HttpRequest, ProviderConfig, SourcePlugin};
use crate::scraper::{
    Result,
    types::{Identity, MetadataRecord},
};
use async_trait::async_trait;
use std::sync::Arc;

pub const NAME: &str = "jav321";

const JAV321_BASE_URL: &str = "https://www.jav321.com";

/// jav321.com: a form POST lands directly on the detail page
pub struct Jav321Provider {
    config: ProviderConfig,
    base_url: String,
    decoder: HtmlDecoder,
}

impl Jav321Provider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let decoder = HtmlDecoder::builder()
            .following(Field::Number, "b", "品番", None)
            .field(Field::Title, "div.panel-heading h3")
            .field(Field::Plot, "div.panel-body div.row div.col-md-12")
            .following(Field::Actors, "b", "出演者", Some("a[href^='/star']"))
            .following(Field::ReleaseDate, "b", "配信開始日", None)
            .following(Field::Duration, "b", "収録時間", None)
            .following(Field::Studio, "b", "メーカー", Some("a[href^='/company']"))
            .following(Field::Label, "b", "メーカー", Some("a[href^='/company']"))
            .following(Field::Series, "b", "シリーズ", None)
            .following(Field::Genres, "b", "ジャンル", Some("a[href^='/genre']"))
            .field(Field::Cover, "div.panel-body div.col-md-3 img.img-responsive@src")
            .field(
                Field::SampleImages,
                "div.col-md-3 div.col-xs-12.col-md-12 p a img@src",
            )
            .build()?;

        Ok(Self {
            base_url: config.base_url(JAV321_BASE_URL),
            config,
            decoder,
        })
    }

    pub fn create(blob: &serde_json::Value) -> Result<Arc<dyn SourcePlugin>> {
        Ok(Arc::new(Self::new(ProviderConfig::from_blob(blob)?)?))
    }
}

#[async_trait]
impl SourcePlugin for Jav321Provider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request(&self, identity: &Identity) -> Result<HttpRequest> {
        HttpRequest::post_form(
            &format!("{}/search", self.base_url),
            &[("sn", identity.code())],
        )
    }

    fn decorate_request(&self, request: &mut HttpRequest) -> Result<()> {
        self.config.apply_cookie(request)
    }

    fn decode(&self, body: &[u8], _identity: &Identity) -> Result<Option<MetadataRecord>> {
        let record = self.decoder.decode(body);
        if record.number.is_empty() {
            return Ok(None);
        }
        Ok(Some(record))
    }
}
