//! Scraper integration tests

#[cfg(test)]
mod support {
    use crate::scraper::{
        HttpRequest, HttpResponse, Identity, ImageRef, MetadataRecord, Result, SourcePlugin,
        Transport,
    };
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory transport keyed by full URL; unknown URLs answer 404
    #[derive(Default)]
    pub struct MockTransport {
        pages: Mutex<HashMap<String, (u16, Vec<u8>)>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn serve(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), (status, body.into()));
        }

        /// Detail page plus cover image for a [`StubPlugin`]
        pub fn serve_release(&self, host: &str, code: &str, title: &str) {
            self.serve(&format!("https://{host}/v/{code}"), 200, title);
            self.serve(&format!("https://{host}/img/{code}.jpg"), 200, "jpeg");
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
        }

        pub fn calls_to_host(&self, host: &str) -> usize {
            let prefix = format!("https://{host}/");
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.starts_with(&prefix))
                .count()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            let url = request.url.to_string();
            self.calls.lock().unwrap().push(url.clone());

            let page = self.pages.lock().unwrap().get(&url).cloned();
            Ok(match page {
                Some((status, body)) => {
                    HttpResponse::new(StatusCode::from_u16(status).unwrap(), body)
                }
                None => HttpResponse::new(StatusCode::NOT_FOUND, Vec::new()),
            })
        }
    }

    /// Plugin whose detail page body is the title and whose cover is a
    /// host-relative URL
    pub struct StubPlugin {
        pub name: &'static str,
        pub host: &'static str,
        pub with_cover: bool,
    }

    impl StubPlugin {
        pub const fn new(name: &'static str, host: &'static str) -> Self {
            Self {
                name,
                host,
                with_cover: true,
            }
        }

        pub const fn without_cover(mut self) -> Self {
            self.with_cover = false;
            self
        }
    }

    #[async_trait]
    impl SourcePlugin for StubPlugin {
        fn name(&self) -> &'static str {
            self.name
        }

        fn build_request(&self, identity: &Identity) -> Result<HttpRequest> {
            HttpRequest::get(&format!("https://{}/v/{}", self.host, identity.code()))
        }

        /// Some sites answer 200 with a "no such title" page
        fn precheck_response(&self, response: &HttpResponse) -> bool {
            response.status != StatusCode::NOT_FOUND && response.body != b"no such title"
        }

        fn decode(&self, body: &[u8], identity: &Identity) -> Result<Option<MetadataRecord>> {
            let title = String::from_utf8_lossy(body).trim().to_string();
            if title.is_empty() {
                return Ok(None);
            }

            let cover = self
                .with_cover
                .then(|| ImageRef::new(format!("/img/{}.jpg", identity.code())));
            Ok(Some(MetadataRecord {
                number: identity.code().to_lowercase(),
                title,
                release_date: 1_700_000_000,
                poster: cover.clone(),
                cover,
                ..Default::default()
            }))
        }
    }
}

#[cfg(test)]
mod router_tests {
    use super::support::{MockTransport, StubPlugin};
    use crate::scraper::{
        CategoryRouter, Identity, MemoryStore, PluginRegistry, PluginSearcher, ScraperCache,
        ScraperError, SourcePlugin, Transport, image_key,
    };
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        transport: Arc<MockTransport>,
        cache: Arc<ScraperCache>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                transport: Arc::new(MockTransport::default()),
                cache: Arc::new(ScraperCache::new(Arc::new(MemoryStore::new()))),
            }
        }

        fn searcher(&self, plugin: StubPlugin) -> Arc<PluginSearcher> {
            let plugin: Arc<dyn SourcePlugin> = Arc::new(plugin);
            let transport: Arc<dyn Transport> = self.transport.clone();
            Arc::new(PluginSearcher::new(plugin, self.cache.clone(), transport))
        }
    }

    #[tokio::test]
    async fn test_category_chain_is_used_for_fc2() {
        let fx = Fixture::new();
        fx.transport
            .serve_release("fc2.test", "FC2-PPV-1234567", "FC2 title");
        fx.transport
            .serve_release("main.test", "FC2-PPV-1234567", "main title");

        let router = CategoryRouter::new(vec![fx.searcher(StubPlugin::new("main", "main.test"))])
            .with_category("FC2", vec![fx.searcher(StubPlugin::new("fc2", "fc2.test"))]);

        let identity = Identity::new("fc2-ppv-1234567");
        let result = router
            .search(&identity, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.source, "fc2");
        assert_eq!(result.record.title, "FC2 title");
        assert_eq!(fx.transport.calls_to_host("main.test"), 0);
    }

    #[tokio::test]
    async fn test_empty_category_uses_default_chain() {
        let fx = Fixture::new();
        fx.transport.serve_release("main.test", "ABP-123", "main title");

        let router = CategoryRouter::new(vec![fx.searcher(StubPlugin::new("main", "main.test"))])
            .with_category("FC2", vec![fx.searcher(StubPlugin::new("fc2", "fc2.test"))]);

        let result = router
            .search(&Identity::new("ABP-123"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.source, "main");
        assert_eq!(fx.transport.calls_to_host("fc2.test"), 0);
    }

    #[tokio::test]
    async fn test_record_is_fixed_up_and_stamped() {
        let fx = Fixture::new();
        fx.transport.serve_release("main.test", "ABP-123", "Title");

        let searcher = fx.searcher(StubPlugin::new("main", "main.test"));
        let record = searcher
            .search(&Identity::new("ABP-123"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.number, "ABP-123");
        let cover = record.cover.as_ref().unwrap();
        assert_eq!(cover.name, "https://main.test/img/ABP-123.jpg");
        assert_eq!(cover.key, image_key("https://main.test/img/ABP-123.jpg"));
        assert_eq!(record.provenance().unwrap().source, "main");
        assert!(record.is_verified());

        let image = fx.cache.load_image(&cover.key).await.unwrap();
        assert_eq!(image.as_deref(), Some(b"jpeg".as_slice()));
    }

    #[tokio::test]
    async fn test_page_and_image_fetched_once() {
        let fx = Fixture::new();
        fx.transport.serve_release("main.test", "ABP-123", "Title");

        let searcher = fx.searcher(StubPlugin::new("main", "main.test"));
        let identity = Identity::new("ABP-123");
        let cancel = CancellationToken::new();
        searcher.search(&identity, &cancel).await.unwrap();
        searcher.search(&identity, &cancel).await.unwrap();

        assert_eq!(fx.transport.calls_to("https://main.test/v/ABP-123"), 1);
        assert_eq!(fx.transport.calls_to("https://main.test/img/ABP-123.jpg"), 1);
    }

    #[tokio::test]
    async fn test_unverified_record_falls_through() {
        let fx = Fixture::new();
        fx.transport.serve_release("bare.test", "ABP-123", "No cover");
        fx.transport.serve_release("full.test", "ABP-123", "Complete");

        let bare = fx.searcher(StubPlugin::new("bare", "bare.test").without_cover());
        let err = bare
            .search(&Identity::new("ABP-123"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let router = CategoryRouter::new(vec![
            bare,
            fx.searcher(StubPlugin::new("full", "full.test")),
        ]);
        let result = router
            .search(&Identity::new("ABP-123"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.source, "full");
    }

    #[tokio::test]
    async fn test_failed_cover_download_fails_verification() {
        let fx = Fixture::new();
        fx.transport.serve("https://main.test/v/ABP-123", 200, "Title");

        let searcher = fx.searcher(StubPlugin::new("main", "main.test"));
        let err = searcher
            .search(&Identity::new("ABP-123"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(fx.transport.calls_to("https://main.test/img/ABP-123.jpg") > 0);
    }

    #[tokio::test]
    async fn test_last_hard_error_is_surfaced() {
        let fx = Fixture::new();
        fx.transport.serve("https://broken.test/v/ABP-123", 500, "oops");

        let router = CategoryRouter::new(vec![
            fx.searcher(StubPlugin::new("broken", "broken.test")),
            fx.searcher(StubPlugin::new("empty", "empty.test")),
        ]);
        let err = router
            .search(&Identity::new("ABP-123"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScraperError::Api { status: 500, .. }));
        assert_eq!(fx.transport.calls_to_host("empty.test"), 1);
    }

    #[tokio::test]
    async fn test_all_soft_misses_report_not_found() {
        let fx = Fixture::new();
        let router = CategoryRouter::new(vec![
            fx.searcher(StubPlugin::new("a", "a.test")),
            fx.searcher(StubPlugin::new("b", "b.test")),
        ]);

        let err = router
            .search(&Identity::new("ABP-123"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fx.transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_error_pages_are_not_cached() {
        let fx = Fixture::new();
        fx.transport.serve("https://broken.test/v/ABP-123", 500, "oops");

        let searcher = fx.searcher(StubPlugin::new("broken", "broken.test"));
        let identity = Identity::new("ABP-123");
        let cancel = CancellationToken::new();
        assert!(searcher.search(&identity, &cancel).await.is_err());
        assert!(searcher.search(&identity, &cancel).await.is_err());

        assert_eq!(fx.transport.calls_to("https://broken.test/v/ABP-123"), 2);
    }

    #[tokio::test]
    async fn test_rejected_pages_are_not_cached() {
        let fx = Fixture::new();
        fx.transport
            .serve("https://late.test/v/ABP-123", 200, "no such title");

        let searcher = fx.searcher(StubPlugin::new("late", "late.test"));
        let identity = Identity::new("ABP-123");
        let cancel = CancellationToken::new();
        let err = searcher.search(&identity, &cancel).await.unwrap_err();
        assert!(err.is_not_found());

        fx.transport.serve_release("late.test", "ABP-123", "Title");
        let record = searcher.search(&identity, &cancel).await.unwrap();

        assert_eq!(record.title, "Title");
        assert_eq!(fx.transport.calls_to("https://late.test/v/ABP-123"), 2);
    }

    #[tokio::test]
    async fn test_cancelled_search_makes_no_requests() {
        let fx = Fixture::new();
        fx.transport.serve_release("main.test", "ABP-123", "Title");

        let router = CategoryRouter::new(vec![fx.searcher(StubPlugin::new("main", "main.test"))]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = router
            .search(&Identity::new("ABP-123"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::Cancelled));
        assert!(fx.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_identity_is_not_searched() {
        let fx = Fixture::new();
        let router = CategoryRouter::new(vec![fx.searcher(StubPlugin::new("main", "main.test"))]);

        let err = router
            .search(&Identity::new(""), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(fx.transport.calls().is_empty());
    }

    #[test]
    fn test_from_config_rejects_bad_chains() {
        let fx = Fixture::new();
        let registry = PluginRegistry::with_defaults();
        let transport: Arc<dyn Transport> = fx.transport.clone();
        let build = |default: Vec<&str>, categories: Vec<(&str, Vec<&str>)>| {
            let default: Vec<String> = default.into_iter().map(String::from).collect();
            let categories: Vec<(String, Vec<String>)> = categories
                .into_iter()
                .map(|(label, names)| {
                    (
                        label.to_string(),
                        names.into_iter().map(String::from).collect(),
                    )
                })
                .collect();
            CategoryRouter::from_config(
                &registry,
                &default,
                &categories,
                &HashMap::new(),
                fx.cache.clone(),
                transport.clone(),
            )
        };

        assert!(build(vec!["javdb", "avsox"], vec![("FC2", vec!["fc2ppvdb"])]).is_ok());
        assert!(matches!(build(vec!["javbus"], vec![]), Err(ScraperError::Config(_))));
        assert!(matches!(build(vec![], vec![]), Err(ScraperError::Config(_))));
        assert!(matches!(
            build(vec!["javdb"], vec![("", vec!["avsox"])]),
            Err(ScraperError::Config(_))
        ));
        assert!(matches!(
            build(vec!["javdb"], vec![("FC2", vec![])]),
            Err(ScraperError::Config(_))
        ));
    }
}

#[cfg(test)]
mod two_step_tests {
    use super::support::MockTransport;
    use crate::scraper::{
        Identity, MemoryStore, PluginSearcher, ScraperCache, ScraperError, SourcePlugin,
        Transport, provider::JavDbProvider,
    };
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    const LISTING: &str = r#"<html><body><div class="movie-list">
        <div class="item"><a href="/v/xyz"><div class="video-title"><strong>ABP-123</strong> Title</div></a></div>
        <div class="item"><a href="/v/other"><div class="video-title"><strong>ABP-1234</strong> Other</div></a></div>
    </div></body></html>"#;

    const DETAIL: &str = r##"<html><body>
        <h2 class="title"><strong class="current-title">Javdb Title</strong></h2>
        <a class="copy-to-clipboard" data-clipboard-text="ABP-123">copy</a>
        <div class="column-video-cover"><a href="#"><img src="/covers/abp123.jpg"></a></div>
        <nav>
            <div class="panel-block"><strong>日期:</strong> <span class="value">2023-05-01</span></div>
            <div class="panel-block"><strong>片商:</strong> <span class="value">Prestige</span></div>
        </nav>
    </body></html>"##;

    fn searcher(transport: &Arc<MockTransport>) -> PluginSearcher {
        let config = serde_json::json!({ "base_url": "https://javdb.test/" });
        let plugin: Arc<dyn SourcePlugin> = JavDbProvider::create(&config).unwrap();
        let transport: Arc<dyn Transport> = transport.clone();
        PluginSearcher::new(
            plugin,
            Arc::new(ScraperCache::new(Arc::new(MemoryStore::new()))),
            transport,
        )
    }

    #[tokio::test]
    async fn test_listing_then_detail() {
        let transport = Arc::new(MockTransport::default());
        transport.serve("https://javdb.test/search?q=ABP-123&f=all", 200, LISTING);
        transport.serve("https://javdb.test/v/xyz", 200, DETAIL);
        transport.serve("https://javdb.test/covers/abp123.jpg", 200, "jpeg");

        let record = searcher(&transport)
            .search(&Identity::new("abp-123"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.title, "Javdb Title");
        assert_eq!(record.studio, "Prestige");
        assert_eq!(record.release_date, 1_682_899_200);
        assert_eq!(
            record.poster.as_ref().unwrap().key,
            record.cover.as_ref().unwrap().key
        );
        assert_eq!(transport.calls_to("https://javdb.test/v/other"), 0);
    }

    #[tokio::test]
    async fn test_ambiguous_listing_is_not_found() {
        let transport = Arc::new(MockTransport::default());
        let listing = LISTING.replace("ABP-1234", "ABP_123");
        transport.serve("https://javdb.test/search?q=ABP-123&f=all", 200, listing);

        let err = searcher(&transport)
            .search(&Identity::new("ABP-123"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScraperError::NotFound(_)));
        assert_eq!(transport.calls().len(), 1);
    }
}

#[cfg(test)]
mod capture_tests {
    use super::support::{MockTransport, StubPlugin};
    use crate::scraper::{
        CategoryRouter, MemoryStore, Parser, PluginSearcher, Scanner, ScraperCache, Transport,
    };
    use crate::services::{Capture, JsonLinesSink};
    use std::fs::File;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_batch_writes_found_records() {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join("abp-123.mp4")).unwrap();
        File::create(temp_dir.path().join("ABP-999.mkv")).unwrap();

        let transport = Arc::new(MockTransport::default());
        transport.serve_release("main.test", "ABP-123", "Found");
        let dyn_transport: Arc<dyn Transport> = transport.clone();
        let searcher = PluginSearcher::new(
            Arc::new(StubPlugin::new("main", "main.test")),
            Arc::new(ScraperCache::new(Arc::new(MemoryStore::new()))),
            dyn_transport,
        );
        let router = CategoryRouter::new(vec![Arc::new(searcher)]);

        let capture = Capture::new(Scanner::new(), Parser::default(), Arc::new(router));
        let mut sink = JsonLinesSink::new(Vec::new());
        let summary = capture
            .run(temp_dir.path(), &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.found, 1);
        assert_eq!(summary.not_found, 1);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["source"], "main");
        assert_eq!(lines[0]["record"]["number"], "ABP-123");
        assert_eq!(lines[0]["file_name_base"], "ABP-123");
    }
}

#[cfg(test)]
mod reconcile_tests {
    use crate::scraper::{FileContext, Parser, reconcile};
    use std::path::PathBuf;

    fn context(parser: &Parser, path: &str) -> FileContext {
        let path = PathBuf::from(path);
        let identity = parser.parse_path(&path).unwrap();
        FileContext::new(path, identity)
    }

    #[test]
    fn test_part_c_next_to_part_b() {
        let parser = Parser::default();
        let mut files = vec![
            context(&parser, "/media/IPTD-899-B.mp4"),
            context(&parser, "/media/IPTD-899-C.mp4"),
            context(&parser, "/other/IPTD-899-C.mp4"),
        ];
        assert!(files[1].identity.is_chinese_subtitle);

        reconcile(&mut files);

        assert!(files[1].identity.episode_is("C"));
        assert!(!files[1].identity.is_chinese_subtitle);
        assert!(files[2].identity.is_chinese_subtitle);
    }
}
