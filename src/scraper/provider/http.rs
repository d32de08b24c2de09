use crate::scraper::{Result, ScraperError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Proxy, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::Duration;

/// Outgoing request, owned so plugins can build and decorate it freely
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| ScraperError::Input(format!("invalid url `{url}`: {e}")))?;

        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    /// POST with an `application/x-www-form-urlencoded` body
    pub fn post_form(url: &str, fields: &[(&str, &str)]) -> Result<Self> {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut request = Self::new(Method::POST, url)?;
        request.body = Some(body.into_bytes());
        request.set_header(
            reqwest::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )?;
        Ok(request)
    }

    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<()> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ScraperError::Input(format!("invalid header value for {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn set_header_if_absent(&mut self, name: HeaderName, value: &str) -> Result<()> {
        if self.headers.contains_key(&name) {
            return Ok(());
        }
        self.set_header(name, value)
    }

    /// `scheme://host[:port]` of the request URL
    #[must_use]
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }
}

/// Fully buffered response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ScraperError::Parse(format!("JSON parse error: {e}")))
    }

    /// Turn a non-200 status into an `Api` error
    pub fn error_for_status(self) -> Result<Self> {
        if self.status == StatusCode::OK {
            return Ok(self);
        }

        Err(ScraperError::Api {
            status: self.status.as_u16(),
            message: self.text().chars().take(200).collect(),
        })
    }
}

/// Shared HTTP transport used by every plugin
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client with a request timeout and an optional proxy URL
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout).cookie_store(true);
        if let Some(proxy) = proxy.filter(|p| !p.is_empty()) {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub const fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(ScraperError::Network)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ScraperError::Network)?;

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
