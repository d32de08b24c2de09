use super::{
    Field, HtmlDecoder, HttpRequest, HttpResponse, Invoker, ProviderConfig, SourcePlugin,
    TitleMatch, TwoStep,
};
use crate::scraper::{
    Result,
    types::{Identity, MetadataRecord},
};
use async_trait::async_trait;
use std::sync::Arc;

pub const NAME: &str = "njav";

const NJAV_BASE_URL: &str = "https://njavtv.com";
const RESULTS: &str = "div.my-2.text-sm.text-nord4.truncate > a.text-secondary";
const LABEL: &str = "div.text-secondary > span";
const LINKED: &str = "a.text-nord13.font-medium";

/// `og:video:duration` is plain seconds
fn parse_seconds(text: &str) -> i64 {
    text.trim().parse().unwrap_or(0)
}

pub struct NjavProvider {
    config: ProviderConfig,
    base_url: String,
    search: TwoStep,
    decoder: HtmlDecoder,
}

impl NjavProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let search = TwoStep::new(
            &format!("{RESULTS}@href"),
            RESULTS,
            TitleMatch::Contains,
        )?;

        let decoder = HtmlDecoder::builder()
            .labelled(Field::Number, LABEL, "番号:", "span.font-medium")
            .labelled(Field::Title, LABEL, "标题:", "span.font-medium")
            .field(Field::Actors, "meta[property='og:video:actor']@content")
            .labelled(Field::ReleaseDate, LABEL, "发行日期:", "time.font-medium")
            .field(Field::Duration, "meta[property='og:video:duration']@content")
            .labelled(Field::Studio, LABEL, "发行商:", LINKED)
            .labelled(Field::Label, LABEL, "标籤:", LINKED)
            .labelled(Field::Director, LABEL, "导演:", LINKED)
            .labelled(Field::Series, LABEL, "系列:", LINKED)
            .labelled(Field::Genres, LABEL, "类型:", LINKED)
            .field(Field::Cover, "link[rel='preload'][as='image']@href")
            .duration_parser(parse_seconds)
            .build()?;

        Ok(Self {
            base_url: config.base_url(NJAV_BASE_URL),
            config,
            search,
            decoder,
        })
    }

    pub fn create(blob: &serde_json::Value) -> Result<Arc<dyn SourcePlugin>> {
        Ok(Arc::new(Self::new(ProviderConfig::from_blob(blob)?)?))
    }
}

#[async_trait]
impl SourcePlugin for NjavProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request(&self, identity: &Identity) -> Result<HttpRequest> {
        let query = identity.code().replace('_', "-");
        HttpRequest::get(&format!(
            "{}/cn/search/{}",
            self.base_url,
            urlencoding::encode(&query)
        ))
    }

    fn decorate_request(&self, request: &mut HttpRequest) -> Result<()> {
        self.config.apply_cookie(request)
    }

    async fn retrieve(
        &self,
        invoker: &Invoker<'_>,
        request: HttpRequest,
        identity: &Identity,
    ) -> Result<HttpResponse> {
        self.search.retrieve(invoker, request, identity).await
    }

    fn decode(&self, body: &[u8], _identity: &Identity) -> Result<Option<MetadataRecord>> {
        let record = self.decoder.decode(body);
        if record.number.is_empty() {
            return Ok(None);
        }
        Ok(Some(record))
    }
}
