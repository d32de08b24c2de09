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

pub const NAME: &str = "tktube";

const TKTUBE_BASE_URL: &str = "https://tktube.com";
const RESULTS: &str = "#list_videos_videos_list_search_result_items div > a";

pub struct TkTubeProvider {
    config: ProviderConfig,
    base_url: String,
    search: TwoStep,
    decoder: HtmlDecoder,
}

impl TkTubeProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let search = TwoStep::new(
            &format!("{RESULTS}@href"),
            &format!("{RESULTS} strong.title"),
            TitleMatch::Contains,
        )?;

        let decoder = HtmlDecoder::builder()
            .field(Field::Title, "div.headline h1")
            .labelled(Field::Actors, "div", "女優:", "a[href*='models']")
            .labelled(Field::ReleaseDate, "div.item > span", "加入日期:", "em")
            .labelled(Field::Duration, "div.item > span", "時長:", "em")
            .labelled(Field::Genres, "div", "標籤:", "a[href*='tags']")
            .field(Field::Cover, "meta[property='og:image']@content")
            .build()?;

        Ok(Self {
            base_url: config.base_url(TKTUBE_BASE_URL),
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
impl SourcePlugin for TkTubeProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request(&self, identity: &Identity) -> Result<HttpRequest> {
        // The site's search treats a single dash as a word separator
        let query = identity.code().replace('-', "--");
        HttpRequest::get(&format!(
            "{}/zh/search/{}/",
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

    fn decode(&self, body: &[u8], identity: &Identity) -> Result<Option<MetadataRecord>> {
        let mut record = self.decoder.decode(body);
        if record.title.is_empty() {
            return Ok(None);
        }
        record.number = identity.code().to_string();
        Ok(Some(record))
    }
}
