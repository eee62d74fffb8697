use crate::domain::model::{ContentSource, Extraction, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// 網路抓取的窄介面，方便在測試中替換
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> impl std::future::Future<Output = Result<FetchResponse>> + Send;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn content_source(&self) -> &ContentSource;
    fn score(&self) -> i64;
    fn title_override(&self) -> Option<&str>;
    fn output_path(&self) -> &str;
    fn attack_version(&self) -> u32;
    fn catalog_url(&self) -> String;
    fn force_html(&self) -> bool;
    fn force_text(&self) -> bool;
    fn page_timeout(&self) -> Duration;
    fn html_sites(&self) -> &[String];
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Extraction>;
    async fn transform(&self, data: Extraction) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
