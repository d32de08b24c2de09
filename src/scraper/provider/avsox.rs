use super::{
    Expr, Field, HtmlDecoder, HttpRequest, HttpResponse, Invoker, ProviderConfig, SourcePlugin,
    resolve_url,
};
use crate::scraper::{
    Result, ScraperError,
    types::{Identity, MetadataRecord},
};
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use tracing::{debug, warn};

pub const NAME: &str = "avsox";

const AVSOX_BASE_URL: &str = "https://avsox.click";
const INFO: &str = "div.info p > span";

/// avsox: searches several spellings of the code, expecting one hit
pub struct AvsoxProvider {
    config: ProviderConfig,
    base_url: String,
    results: Expr,
    decoder: HtmlDecoder,
}

/// `A-1`, then `A_1`, then `A1`
fn spellings(code: &str) -> Vec<String> {
    let mut list = vec![code.to_string()];
    if code.contains('-') {
        list.push(code.replace('-', "_"));
    }
    let joined = list
        .last()
        .filter(|s| s.contains('_'))
        .map(|s| s.replace('_', ""));
    list.extend(joined);
    list
}

impl AvsoxProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let decoder = HtmlDecoder::builder()
            .labelled(Field::Number, INFO, "识别码", "span:nth-of-type(2)")
            .field(Field::Title, "div.container h3")
            .field(Field::Actors, "a.avatar-box span")
            .following(Field::ReleaseDate, INFO, "发行时间", None)
            .following(Field::Duration, INFO, "长度", None)
            .field(Field::Studio, "div.info a[href*='/studio/']")
            .field(Field::Series, "div.info a[href*='/series/']")
            .field(Field::Genres, "span.genre a[href*='genre']")
            .field(Field::Cover, "a.bigImage img@src")
            .build()?;

        Ok(Self {
            base_url: config.base_url(AVSOX_BASE_URL),
            config,
            results: Expr::parse("#waterfall div a@href")?,
            decoder,
        })
    }

    pub fn create(blob: &serde_json::Value) -> Result<Arc<dyn SourcePlugin>> {
        Ok(Arc::new(Self::new(ProviderConfig::from_blob(blob)?)?))
    }

    /// Detail links on a search page
    fn movie_links(&self, body: &[u8]) -> Vec<String> {
        let doc = Html::parse_document(&String::from_utf8_lossy(body));
        self.results
            .values(&doc)
            .into_iter()
            .filter(|link| link.contains("movie"))
            .collect()
    }

    async fn search(&self, invoker: &Invoker<'_>, spelling: &str) -> Result<Option<String>> {
        let request = HttpRequest::get(&format!(
            "{}/cn/search/{}",
            self.base_url,
            urlencoding::encode(spelling)
        ))?;
        let listing = invoker.invoke(request).await?.error_for_status()?;

        let links = self.movie_links(&listing.body);
        match links.as_slice() {
            [link] => Ok(Some(link.clone())),
            [] => Ok(None),
            _ => {
                debug!(spelling, count = links.len(), "ambiguous search result");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SourcePlugin for AvsoxProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request(&self, _identity: &Identity) -> Result<HttpRequest> {
        // Base of the listing searches, retrieve builds one per spelling
        HttpRequest::get(&self.base_url)
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
        let mut last_err = None;
        for spelling in spellings(identity.code()) {
            match self.search(invoker, &spelling).await {
                Ok(Some(link)) => {
                    let detail = resolve_url(&request.url, &link)?;
                    return invoker.invoke(HttpRequest::get(detail.as_str())?).await;
                }
                Ok(None) => debug!(spelling = %spelling, "no single match, trying next spelling"),
                Err(e) => {
                    warn!(spelling = %spelling, "search failed: {}", e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ScraperError::NotFound(format!("no avsox match for {}", identity.code()))
        }))
    }

    fn decode(&self, body: &[u8], _identity: &Identity) -> Result<Option<MetadataRecord>> {
        let record = self.decoder.decode(body);
        if record.number.is_empty() {
            return Ok(None);
        }
        Ok(Some(record))
    }
}
