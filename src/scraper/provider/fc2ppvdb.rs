use super::{Field, HtmlDecoder, HttpRequest, ProviderConfig, SourcePlugin};
use crate::scraper::{
    Result, ScraperError,
    types::{Category, Identity, MetadataRecord},
};
use async_trait::async_trait;
use std::sync::Arc;

pub const NAME: &str = "fc2ppvdb";

const FC2PPVDB_BASE_URL: &str = "https://fc2ppvdb.com";
const INFO: &str = "div";
const COVER: &str = "div.lg\\:w-2\\/5 a img@src";

/// fc2ppvdb.com, serves FC2 releases only
pub struct Fc2PpvDbProvider {
    config: ProviderConfig,
    base_url: String,
    decoder: HtmlDecoder,
}

impl Fc2PpvDbProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let decoder = HtmlDecoder::builder()
            .labelled(Field::Number, INFO, "ID", "span")
            .field(Field::Title, "div.lg\\:pl-8 h2 a")
            .labelled(Field::Actors, INFO, "女優", "span a")
            .labelled(Field::ReleaseDate, INFO, "販売日", "span")
            .labelled(Field::Duration, INFO, "収録時間", "span")
            .labelled(Field::Studio, INFO, "販売者", "span a")
            .labelled(Field::Director, INFO, "販売者", "span a")
            .labelled(Field::Genres, INFO, "タグ", "span a")
            .field(Field::Cover, COVER)
            .field(Field::Poster, COVER)
            .build()?;

        Ok(Self {
            base_url: config.base_url(FC2PPVDB_BASE_URL),
            config,
            decoder,
        })
    }

    pub fn create(blob: &serde_json::Value) -> Result<Arc<dyn SourcePlugin>> {
        Ok(Arc::new(Self::new(ProviderConfig::from_blob(blob)?)?))
    }
}

#[async_trait]
impl SourcePlugin for Fc2PpvDbProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn eligible(&self, identity: &Identity) -> bool {
        identity.has_category(Category::FC2)
    }

    fn build_request(&self, identity: &Identity) -> Result<HttpRequest> {
        let id = identity.fc2_id().ok_or_else(|| {
            ScraperError::Input(format!("no fc2 id in {}", identity.code()))
        })?;
        HttpRequest::get(&format!("{}/articles/{id}", self.base_url))
    }

    fn decorate_request(&self, request: &mut HttpRequest) -> Result<()> {
        self.config.apply_cookie(request)
    }

    fn decode(&self, body: &[u8], identity: &Identity) -> Result<Option<MetadataRecord>> {
        let mut record = self.decoder.decode(body);
        if record.number.is_empty() {
            return Ok(None);
        }
        record.number = identity.code().to_string();
        Ok(Some(record))
    }
}
