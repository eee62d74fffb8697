use crate::core::Fetcher;
use crate::domain::ports::FetchResponse;
use crate::utils::error::Result;
use reqwest::Client;
use std::time::Duration;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, timeout: Option<Duration>) -> Result<FetchResponse> {
        let mut request = self.client.get(url);

        // 設定超時
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!("GET {}", url);
        let response = request.send().await?;
        let status = response.status().as_u16();
        tracing::debug!("Response status: {}", status);

        let body = response.text().await?;
        Ok(FetchResponse { status, body })
    }
}
