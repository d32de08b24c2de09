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

pub const NAME: &str = "javdb";

const JAVDB_BASE_URL: &str = "https://javdb.com";
const INFO: &str = "div.panel-block > strong";

/// javdb.com: search listing, then the detail page
pub struct JavDbProvider {
    config: ProviderConfig,
    base_url: String,
    search: TwoStep,
    decoder: HtmlDecoder,
}

impl JavDbProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let search = TwoStep::new(
            "div.movie-list div.item > a@href",
            "div.movie-list div.item > a div.video-title strong",
            TitleMatch::CleanIdEquals,
        )?;

        let decoder = HtmlDecoder::builder()
            .field(
                Field::Number,
                "a.copy-to-clipboard@data-clipboard-text",
            )
            .field(Field::Title, "h2.title strong.current-title")
            .labelled(Field::Actors, INFO, "演員", "span.value a")
            .labelled(Field::ReleaseDate, INFO, "日期", "span.value")
            .labelled(Field::Duration, INFO, "時長", "span.value")
            .labelled(Field::Studio, INFO, "片商", "span.value")
            .labelled(Field::Series, INFO, "系列", "span.value")
            .labelled(Field::Genres, INFO, "類別", "span.value a")
            .field(Field::Cover, "div.column-video-cover a img@src")
            .field(Field::SampleImages, "div.preview-images a.tile-item@href")
            .build()?;

        Ok(Self {
            base_url: config.base_url(JAVDB_BASE_URL),
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
impl SourcePlugin for JavDbProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request(&self, identity: &Identity) -> Result<HttpRequest> {
        HttpRequest::get(&format!(
            "{}/search?q={}&f=all",
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
        let record = self.decoder.decode(body);
        if record.number.is_empty() {
            return Ok(None);
        }
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_detail_page() {
        let provider = JavDbProvider::new(ProviderConfig::default()).unwrap();
        let page = r#"<html><body>
            <h2 class="title"><strong class="current-title">Javdb Title</strong></h2>
            <a class="copy-to-clipboard" data-clipboard-text="ABP-123">copy</a>
            <div class="column-video-cover"><a href="https://c0.jdbstatic.com/covers/ab/abp123.jpg"><img src="https://c0.jdbstatic.com/covers/ab/abp123.jpg"></a></div>
            <nav class="panel movie-panel-info">
                <div class="panel-block"><strong>日期:</strong> <span class="value">2023-05-01</span></div>
                <div class="panel-block"><strong>時長:</strong> <span class="value">120 分鍾</span></div>
                <div class="panel-block"><strong>片商:</strong> <span class="value"><a href="/makers/1">Prestige</a></span></div>
                <div class="panel-block"><strong>類別:</strong> <span class="value"><a href="/tags?c1=1">Drama</a>, <a href="/tags?c1=2">Romance</a></span></div>
                <div class="panel-block"><strong>演員:</strong> <span class="value"><a href="/actors/1">Alice</a><strong class="symbol female">♀</strong></span></div>
            </nav>
            <div class="preview-images">
                <a class="tile-item" href="https://c0.jdbstatic.com/samples/1.jpg"><img></a>
                <a class="tile-item" href="https://c0.jdbstatic.com/samples/2.jpg"><img></a>
            </div>
        </body></html>"#;

        let record = provider
            .decode(page.as_bytes(), &Identity::new("ABP-123"))
            .unwrap()
            .unwrap();

        assert_eq!(record.number, "ABP-123");
        assert_eq!(record.title, "Javdb Title");
        assert_eq!(record.actors, vec!["Alice"]);
        assert_eq!(record.genres, vec!["Drama", "Romance"]);
        assert_eq!(record.studio, "Prestige");
        assert_eq!(record.release_date, 1_682_899_200);
        assert_eq!(record.duration, 7200);
        assert_eq!(record.sample_images.len(), 2);
        assert_eq!(
            record.cover.unwrap().name,
            "https://c0.jdbstatic.com/covers/ab/abp123.jpg"
        );
    }
}
