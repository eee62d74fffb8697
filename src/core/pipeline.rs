use crate::core::catalog::parse_catalog_json;
use crate::core::document::{parse_html, DEFAULT_PAGE_TITLE};
use crate::core::layer::LayerBuilder;
use crate::core::mode::ModeSelector;
use crate::core::scanner::scan_text;
use crate::core::{ConfigProvider, Fetcher, Pipeline, Storage};
use crate::domain::model::{
    Catalog, ContentSource, Extraction, ParseMode, RawContent, SourceInfo, TransformResult,
};
use crate::utils::error::{EtlError, Result};

pub const DIRECT_TEXT_TITLE: &str = "Direct Text Input";

pub struct TtpPipeline<F: Fetcher, S: Storage, C: ConfigProvider> {
    fetcher: F,
    storage: S,
    config: C,
    selector: ModeSelector,
    builder: LayerBuilder,
}

impl<F: Fetcher, S: Storage, C: ConfigProvider> TtpPipeline<F, S, C> {
    pub fn new(fetcher: F, storage: S, config: C) -> Self {
        let selector = ModeSelector::new(config.html_sites().to_vec());
        let builder = LayerBuilder::new(config.attack_version());
        Self {
            fetcher,
            storage,
            config,
            selector,
            builder,
        }
    }

    fn forced_mode(&self) -> Result<Option<ParseMode>> {
        match (self.config.force_html(), self.config.force_text()) {
            (true, true) => Err(EtlError::ConflictingOptions {
                message: "--force-html and --force-text cannot be used together".to_string(),
            }),
            (true, false) => Ok(Some(ParseMode::Html)),
            (false, true) => Ok(Some(ParseMode::Text)),
            (false, false) => Ok(None),
        }
    }

    async fn load_catalog(&self) -> Result<Catalog> {
        let url = self.config.catalog_url();
        tracing::info!("Fetching MITRE ATT&CK v{} data...", self.config.attack_version());
        tracing::debug!("Catalog URL: {}", url);

        // 目錄抓取不設逾時
        let response = self.fetcher.fetch(&url, None).await.map_err(|e| {
            EtlError::CatalogFetchError {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        if !response.is_success() {
            return Err(EtlError::CatalogFetchError {
                url,
                reason: format!("HTTP status {}", response.status),
            });
        }

        let catalog = parse_catalog_json(&url, &response.body)?;
        tracing::info!(
            "Successfully fetched ATT&CK data, found {} techniques and {} tactics",
            catalog.techniques.len(),
            catalog.tactics.len()
        );
        Ok(catalog)
    }

    async fn acquire_content(&self, forced: Option<ParseMode>) -> Result<RawContent> {
        let as_html = forced == Some(ParseMode::Html);

        match self.config.content_source() {
            ContentSource::Url(url) => {
                tracing::info!("Fetching content from {}...", url);
                let response = self
                    .fetcher
                    .fetch(url, Some(self.config.page_timeout()))
                    .await
                    .map_err(|e| EtlError::TargetFetchError {
                        url: url.clone(),
                        reason: e.to_string(),
                    })?;

                if !response.is_success() {
                    return Err(EtlError::TargetFetchError {
                        url: url.clone(),
                        reason: format!("HTTP status {}", response.status),
                    });
                }

                Ok(RawContent::Html {
                    url: Some(url.clone()),
                    body: response.body,
                    title_hint: None,
                })
            }
            ContentSource::File(path) => {
                tracing::info!("Reading content from {}...", path);
                let bytes = self.storage.read_file(path).await.map_err(|e| match e {
                    EtlError::IoError(source) => EtlError::FileReadError {
                        path: path.clone(),
                        source,
                    },
                    other => other,
                })?;
                let body = String::from_utf8(bytes).map_err(|e| EtlError::FileReadError {
                    path: path.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                })?;

                Ok(if as_html {
                    RawContent::Html {
                        url: None,
                        body,
                        title_hint: Some(path.clone()),
                    }
                } else {
                    RawContent::Text {
                        title: path.clone(),
                        body,
                    }
                })
            }
            ContentSource::Text(text) => Ok(if as_html {
                RawContent::Html {
                    url: None,
                    body: text.clone(),
                    title_hint: Some(DIRECT_TEXT_TITLE.to_string()),
                }
            } else {
                RawContent::Text {
                    title: DIRECT_TEXT_TITLE.to_string(),
                    body: text.clone(),
                }
            }),
        }
    }
}

#[async_trait::async_trait]
impl<F: Fetcher, S: Storage, C: ConfigProvider> Pipeline for TtpPipeline<F, S, C> {
    async fn extract(&self) -> Result<Extraction> {
        let forced = self.forced_mode()?;
        let catalog = self.load_catalog().await?;
        let content = self.acquire_content(forced).await?;
        Ok(Extraction { catalog, content })
    }

    async fn transform(&self, data: Extraction) -> Result<TransformResult> {
        let forced = self.forced_mode()?;
        let Extraction { catalog, content } = data;

        tracing::info!("Parsing for MITRE ATT&CK identifiers...");
        let (found, mut source) = match content {
            RawContent::Html {
                url,
                body,
                title_hint,
            } => {
                let doc = parse_html(&body);
                let analysis = self.selector.analyze(url.as_deref(), &doc, &catalog, forced);
                tracing::info!(
                    "Using {} ({:?})",
                    analysis.decision.mode().label(),
                    analysis.decision.reason
                );

                let title = analysis
                    .title
                    .or(title_hint)
                    .unwrap_or_else(|| DEFAULT_PAGE_TITLE.to_string());
                if url.is_some() {
                    tracing::info!("Title detected: {}", title);
                }

                let source = SourceInfo {
                    url,
                    title: Some(title),
                    html_mode_used: Some(analysis.decision.html_mode),
                };
                (analysis.found, source)
            }
            RawContent::Text { title, body } => {
                let source = SourceInfo {
                    url: None,
                    title: Some(title),
                    html_mode_used: Some(false),
                };
                (scan_text(&body, &catalog), source)
            }
        };

        if let Some(title) = self.config.title_override() {
            source.title = Some(title.to_string());
        }

        tracing::info!(
            "Found {} techniques and {} tactics. Creating Navigator layer...",
            found.techniques.len(),
            found.tactics.len()
        );
        let layer = self.builder.build(&found, self.config.score(), Some(&source));

        Ok(TransformResult {
            layer,
            found,
            catalog,
            source,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output_path = self.config.output_path().to_string();
        let json = serde_json::to_string_pretty(&result.layer)?;

        tracing::debug!("Writing layer ({} bytes) to {}", json.len(), output_path);
        self.storage.write_file(&output_path, json.as_bytes()).await?;

        tracing::info!("Navigator layer saved to {}", output_path);
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::tests::sample_catalog;
    use crate::domain::layer::NavigatorLayer;
    use crate::domain::model::FoundIdentifiers;
    use crate::domain::ports::FetchResponse;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    const CATALOG_URL: &str = "https://catalog.test/v17.json";

    fn catalog_body() -> String {
        serde_json::json!({
            "type": "bundle",
            "objects": [
                {
                    "type": "attack-pattern",
                    "name": "Phishing",
                    "external_references": [{"source_name": "mitre-attack", "external_id": "T1566"}]
                },
                {
                    "type": "attack-pattern",
                    "name": "Spearphishing Attachment",
                    "external_references": [{"source_name": "mitre-attack", "external_id": "T1566.001"}]
                },
                {
                    "type": "attack-pattern",
                    "name": "Command and Scripting Interpreter",
                    "external_references": [{"source_name": "mitre-attack", "external_id": "T1059"}]
                },
                {
                    "type": "x-mitre-tactic",
                    "name": "Initial Access",
                    "external_references": [{"source_name": "mitre-attack", "external_id": "TA0001"}]
                }
            ]
        })
        .to_string()
    }

    #[derive(Clone, Default)]
    struct MockFetcher {
        responses: HashMap<String, FetchResponse>,
        calls: Arc<Mutex<Vec<(String, Option<Duration>)>>>,
    }

    impl MockFetcher {
        fn with(mut self, url: &str, status: u16, body: &str) -> Self {
            self.responses.insert(
                url.to_string(),
                FetchResponse {
                    status,
                    body: body.to_string(),
                },
            );
            self
        }
    }

    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &str, timeout: Option<Duration>) -> Result<FetchResponse> {
            self.calls.lock().await.push((url.to_string(), timeout));
            self.responses.get(url).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    format!("no route to {}", url),
                ))
            })
        }
    }

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put(&self, path: &str, data: &[u8]) {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        source: ContentSource,
        score: i64,
        title: Option<String>,
        force_html: bool,
        force_text: bool,
        html_sites: Vec<String>,
    }

    impl MockConfig {
        fn new(source: ContentSource) -> Self {
            Self {
                source,
                score: 100,
                title: None,
                force_html: false,
                force_text: false,
                html_sites: vec![],
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn content_source(&self) -> &ContentSource {
            &self.source
        }

        fn score(&self) -> i64 {
            self.score
        }

        fn title_override(&self) -> Option<&str> {
            self.title.as_deref()
        }

        fn output_path(&self) -> &str {
            "layer.json"
        }

        fn attack_version(&self) -> u32 {
            17
        }

        fn catalog_url(&self) -> String {
            CATALOG_URL.to_string()
        }

        fn force_html(&self) -> bool {
            self.force_html
        }

        fn force_text(&self) -> bool {
            self.force_text
        }

        fn page_timeout(&self) -> Duration {
            Duration::from_secs(30)
        }

        fn html_sites(&self) -> &[String] {
            &self.html_sites
        }
    }

    #[tokio::test]
    async fn test_extract_text_source() {
        let fetcher = MockFetcher::default().with(CATALOG_URL, 200, &catalog_body());
        let config = MockConfig::new(ContentSource::Text("T1566".to_string()));
        let pipeline = TtpPipeline::new(fetcher.clone(), MockStorage::new(), config);

        let extraction = pipeline.extract().await.unwrap();

        assert_eq!(extraction.catalog.techniques.len(), 3);
        assert_eq!(
            extraction.content,
            RawContent::Text {
                title: DIRECT_TEXT_TITLE.to_string(),
                body: "T1566".to_string()
            }
        );
        // 目錄抓取沒有逾時
        assert_eq!(fetcher.calls.lock().await[0], (CATALOG_URL.to_string(), None));
    }

    #[tokio::test]
    async fn test_catalog_status_error_is_terminal() {
        let fetcher = MockFetcher::default().with(CATALOG_URL, 404, "Not Found");
        let config = MockConfig::new(ContentSource::Text("T1566".to_string()));
        let pipeline = TtpPipeline::new(fetcher, MockStorage::new(), config);

        let err = pipeline.extract().await.unwrap_err();
        match err {
            EtlError::CatalogFetchError { url, reason } => {
                assert_eq!(url, CATALOG_URL);
                assert!(reason.contains("404"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_catalog_transport_error_is_terminal() {
        let config = MockConfig::new(ContentSource::Text("T1566".to_string()));
        let pipeline = TtpPipeline::new(MockFetcher::default(), MockStorage::new(), config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::CatalogFetchError { .. }));
    }

    #[tokio::test]
    async fn test_target_fetch_uses_timeout_and_reports_status() {
        let page = "https://blog.test/report";
        let fetcher = MockFetcher::default()
            .with(CATALOG_URL, 200, &catalog_body())
            .with(page, 503, "busy");
        let config = MockConfig::new(ContentSource::Url(page.to_string()));
        let pipeline = TtpPipeline::new(fetcher.clone(), MockStorage::new(), config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::TargetFetchError { ref reason, .. } if reason.contains("503")));

        let calls = fetcher.calls.lock().await;
        assert_eq!(calls[1], (page.to_string(), Some(Duration::from_secs(30))));
    }

    #[tokio::test]
    async fn test_missing_file_is_file_read_error() {
        let fetcher = MockFetcher::default().with(CATALOG_URL, 200, &catalog_body());
        let config = MockConfig::new(ContentSource::File("missing.txt".to_string()));
        let pipeline = TtpPipeline::new(fetcher, MockStorage::new(), config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::FileReadError { ref path, .. } if path == "missing.txt"));
    }

    #[tokio::test]
    async fn test_conflicting_force_flags_fail_before_fetching() {
        let fetcher = MockFetcher::default().with(CATALOG_URL, 200, &catalog_body());
        let mut config = MockConfig::new(ContentSource::Text("T1566".to_string()));
        config.force_html = true;
        config.force_text = true;
        let pipeline = TtpPipeline::new(fetcher.clone(), MockStorage::new(), config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::ConflictingOptions { .. }));
        assert!(fetcher.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_transform_text_end_to_end_example() {
        let fetcher = MockFetcher::default().with(CATALOG_URL, 200, &catalog_body());
        let text = "APT29 used spearphishing (T1566) to gain initial access, part of TA0001.";
        let mut config = MockConfig::new(ContentSource::Text(text.to_string()));
        config.score = 80;
        let pipeline = TtpPipeline::new(fetcher, MockStorage::new(), config);

        let extraction = pipeline.extract().await.unwrap();
        let result = pipeline.transform(extraction).await.unwrap();

        assert_eq!(result.found.techniques.iter().collect::<Vec<_>>(), vec!["T1566"]);
        assert_eq!(result.found.tactics.iter().collect::<Vec<_>>(), vec!["TA0001"]);
        assert_eq!(result.layer.techniques.len(), 1);
        assert_eq!(result.layer.techniques[0].technique_id, "T1566");
        assert_eq!(result.layer.techniques[0].score, 80);
        assert!(result.layer.techniques[0].enabled);
        assert!(result
            .layer
            .metadata
            .iter()
            .any(|m| m.name == "Related Tactics" && m.value == "TA0001"));
        assert_eq!(result.layer.name, DIRECT_TEXT_TITLE);
    }

    #[tokio::test]
    async fn test_transform_url_uses_hyperlink_mode() {
        let page = "https://blog.test/report";
        let html = r#"<html><head><title>Campaign X</title></head><body>
            <p>Initial access via
            <a href="https://attack.mitre.org/techniques/T1566/001/">a malicious attachment</a>,
            then T1059.</p></body></html>"#;
        let fetcher = MockFetcher::default()
            .with(CATALOG_URL, 200, &catalog_body())
            .with(page, 200, html);
        let config = MockConfig::new(ContentSource::Url(page.to_string()));
        let pipeline = TtpPipeline::new(fetcher, MockStorage::new(), config);

        let extraction = pipeline.extract().await.unwrap();
        let result = pipeline.transform(extraction).await.unwrap();

        assert_eq!(result.source.html_mode_used, Some(true));
        assert_eq!(result.source.title.as_deref(), Some("Campaign X"));
        assert!(result.found.techniques.contains("T1566.001"));
        assert!(result.found.techniques.contains("T1059"));
        assert_eq!(result.layer.links.as_ref().unwrap()[0].url, page);
    }

    #[tokio::test]
    async fn test_transform_untitled_page_gets_default_title() {
        let page = "https://blog.test/plain";
        let fetcher = MockFetcher::default()
            .with(CATALOG_URL, 200, &catalog_body())
            .with(page, 200, "<html><body><p>We saw T1059.</p></body></html>");
        let config = MockConfig::new(ContentSource::Url(page.to_string()));
        let pipeline = TtpPipeline::new(fetcher, MockStorage::new(), config);

        let extraction = pipeline.extract().await.unwrap();
        let result = pipeline.transform(extraction).await.unwrap();

        assert_eq!(result.source.title.as_deref(), Some(DEFAULT_PAGE_TITLE));
        assert_eq!(result.source.html_mode_used, Some(false));
        assert!(result
            .layer
            .metadata
            .iter()
            .any(|m| m.name == "Parsing Mode" && m.value == "Text parsing"));
    }

    #[tokio::test]
    async fn test_title_override_wins() {
        let storage = MockStorage::new();
        storage.put("intel.txt", b"Observed T1059 execution").await;
        let fetcher = MockFetcher::default().with(CATALOG_URL, 200, &catalog_body());
        let mut config = MockConfig::new(ContentSource::File("intel.txt".to_string()));
        config.title = Some("Custom Layer".to_string());
        let pipeline = TtpPipeline::new(fetcher, storage, config);

        let extraction = pipeline.extract().await.unwrap();
        let result = pipeline.transform(extraction).await.unwrap();

        assert_eq!(result.layer.name, "Custom Layer");
        assert!(result.found.techniques.contains("T1059"));
    }

    #[tokio::test]
    async fn test_load_writes_pretty_json() {
        let storage = MockStorage::new();
        let config = MockConfig::new(ContentSource::Text(String::new()));
        let pipeline = TtpPipeline::new(MockFetcher::default(), storage.clone(), config);

        let mut found = FoundIdentifiers::default();
        found.techniques.insert("T1566".to_string());
        let layer = LayerBuilder::default().build(&found, 100, None);
        let result = TransformResult {
            layer: layer.clone(),
            found,
            catalog: sample_catalog(),
            source: SourceInfo::default(),
        };

        let path = pipeline.load(result).await.unwrap();
        assert_eq!(path, "layer.json");

        let bytes = storage.get_file("layer.json").await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("{\n  \"name\""));
        let parsed: NavigatorLayer = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, layer);
    }
}
