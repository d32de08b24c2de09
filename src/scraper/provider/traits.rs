use super::http::{HttpRequest, HttpResponse, Transport};
use crate::scraper::{
    Result,
    types::{Identity, MetadataRecord},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{REFERER, USER_AGENT};

/// Capability interface implemented once per external metadata source
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Registry name, also the page-cache key prefix
    fn name(&self) -> &'static str;

    /// Cheap local gate run before any request is built
    fn eligible(&self, _identity: &Identity) -> bool {
        true
    }

    /// Build the first request for an identity
    fn build_request(&self, identity: &Identity) -> Result<HttpRequest>;

    /// Attach headers or cookies to page requests
    fn decorate_request(&self, _request: &mut HttpRequest) -> Result<()> {
        Ok(())
    }

    /// Attach headers or cookies to image requests
    fn decorate_media_request(&self, _request: &mut HttpRequest) -> Result<()> {
        Ok(())
    }

    /// Fetch the detail page. Plugins with a search step override this.
    async fn retrieve(
        &self,
        invoker: &Invoker<'_>,
        request: HttpRequest,
        _identity: &Identity,
    ) -> Result<HttpResponse> {
        invoker.invoke(request).await
    }

    /// `false` means the source has no such title
    fn precheck_response(&self, response: &HttpResponse) -> bool {
        response.status != StatusCode::NOT_FOUND
    }

    /// Decode a detail page; `Ok(None)` is a soft not-found
    fn decode(&self, body: &[u8], identity: &Identity) -> Result<Option<MetadataRecord>>;
}

/// Sends page requests on behalf of one plugin.
///
/// Applies the plugin's decoration first, then the default headers.
pub struct Invoker<'a> {
    transport: &'a dyn Transport,
    plugin: &'a dyn SourcePlugin,
    user_agent: &'a str,
}

impl<'a> Invoker<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        plugin: &'a dyn SourcePlugin,
        user_agent: &'a str,
    ) -> Self {
        Self {
            transport,
            plugin,
            user_agent,
        }
    }

    pub async fn invoke(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        self.plugin.decorate_request(&mut request)?;
        apply_default_headers(&mut request, self.user_agent)?;
        self.transport.execute(request).await
    }

    /// Same as [`Invoker::invoke`] but with media decoration
    pub async fn invoke_media(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        self.plugin.decorate_media_request(&mut request)?;
        apply_default_headers(&mut request, self.user_agent)?;
        self.transport.execute(request).await
    }
}

/// `User-Agent` and `Referer: <origin>/` unless the plugin set them
pub fn apply_default_headers(request: &mut HttpRequest, user_agent: &str) -> Result<()> {
    request.set_header_if_absent(USER_AGENT, user_agent)?;
    let referer = format!("{}/", request.origin());
    request.set_header_if_absent(REFERER, &referer)
}
