//! Page fetching over plain HTTP with a shared retry policy.

use std::time::Duration;

use reqwest::Client;
use tracing::warn;

use crate::config::RetrySettings;
use crate::model::FetchError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        Ok(response.text().await?)
    }
}

/// Fixed-count, fixed-delay retry wrapper used by every fetcher.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    settings: RetrySettings,
}

impl RetryPolicy {
    pub fn new(settings: RetrySettings) -> Self {
        Self { settings }
    }

    pub async fn fetch(
        &self,
        fetcher: &dyn PageFetcher,
        url: &str,
    ) -> Result<String, FetchError> {
        let max = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match fetcher.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(err) if attempt < max && err.is_retryable() => {
                    warn!(url, attempt, max, "fetch attempt failed: {err}");
                    tokio::time::sleep(self.settings.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
