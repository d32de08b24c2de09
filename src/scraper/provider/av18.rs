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

pub const NAME: &str = "18av";

const AV18_BASE_URL: &str = "https://18av.me";
const RESULTS: &str = "div.content.flex-columns.small.px-2 > span.title > a";
const TAGS: &str = "div.tag-info";
const PLOT_LABEL: &str = "简介：";

/// 18av.me: keyword search, then the detail page
pub struct Av18Provider {
    config: ProviderConfig,
    base_url: String,
    search: TwoStep,
    decoder: HtmlDecoder,
}

impl Av18Provider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let search = TwoStep::new(
            &format!("{RESULTS}@href"),
            RESULTS,
            TitleMatch::ContainsCode,
        )?;

        let decoder = HtmlDecoder::builder()
            .field(Field::Number, "div.px-0.flex-columns > div.number")
            .field(Field::Title, "div.name.bg-w > h1.h4.b")
            .containing(Field::Plot, "div.intro p", PLOT_LABEL)
            .field(Field::Actors, &format!("{TAGS} > a span[itemprop='name']"))
            .field(Field::ReleaseDate, "div.date")
            .field(Field::Series, "div.bd-top.my-1.align-items-center > a.bg-primary")
            .field(Field::Genres, &format!("{TAGS} > a[href*='s_type=tag']"))
            .field(Field::Cover, "meta[property='og:image']@content")
            .field(Field::SampleImages, "div.cover > a > img@data-src")
            .build()?;

        Ok(Self {
            base_url: config.base_url(AV18_BASE_URL),
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
impl SourcePlugin for Av18Provider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request(&self, identity: &Identity) -> Result<HttpRequest> {
        HttpRequest::get(&format!(
            "{}/cn/search.php?kw_type=key&kw={}",
            self.base_url,
            urlencoding::encode(identity.code())
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
        let mut record = self.decoder.decode(body);
        if record.number.is_empty() {
            return Ok(None);
        }

        // Cover URLs are served with stray spaces in the path
        for image in record.cover.iter_mut().chain(record.poster.iter_mut()) {
            image.name.retain(|c| c != ' ');
        }
        record.plot = record
            .plot
            .trim_start_matches(|c: char| PLOT_LABEL.contains(c))
            .trim()
            .to_string();
        Ok(Some(record))
    }
}
