//! HTTP download of the supplier feed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use stocksync_core::AppConfig;

use crate::error::FeedError;
use crate::retry::retry_with_backoff;

/// Where the raw feed body comes from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Downloads the complete feed body.
    ///
    /// # Errors
    ///
    /// Any [`FeedError`]; the cache treats every error as "no data".
    async fn fetch(&self) -> Result<Vec<u8>, FeedError>;
}

/// Downloads the supplier CSV over HTTP(S).
///
/// The configured timeout bounds the whole download, retries and backoff
/// included. Network failures, 429 and 5xx responses are retried up to
/// `max_retries` extra times with exponential backoff while time remains;
/// other non-2xx statuses and empty bodies fail at once.
pub struct FeedClient {
    client: Client,
    url: String,
    timeout: Duration,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl FeedClient {
    /// # Errors
    ///
    /// - [`FeedError::InvalidUrl`] if `url` does not parse or is not http(s).
    /// - [`FeedError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, FeedError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FeedError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FeedError::InvalidUrl {
                url: url.to_owned(),
                reason: format!("unsupported scheme \"{}\"", parsed.scheme()),
            });
        }

        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            url: url.to_owned(),
            timeout,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Builds a client from the feed settings in `config`.
    ///
    /// # Errors
    ///
    /// Same as [`FeedClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, FeedError> {
        Self::new(
            &config.feed_url,
            config.feed_timeout_secs,
            &config.feed_user_agent,
            config.feed_max_retries,
            config.feed_retry_backoff_base_secs,
        )
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
        let client = &self.client;
        let url = self.url.as_str();

        let download = retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let response = client
                .get(url)
                .header(
                    reqwest::header::ACCEPT,
                    "text/csv,text/plain;q=0.9,*/*;q=0.8",
                )
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(FeedError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            let body = response.bytes().await?;
            if body.is_empty() {
                return Err(FeedError::EmptyBody {
                    url: url.to_owned(),
                });
            }
            Ok(body.to_vec())
        });

        let body = tokio::time::timeout(self.timeout, download)
            .await
            .map_err(|_| FeedError::Timeout {
                url: url.to_owned(),
                secs: self.timeout.as_secs(),
            })??;

        tracing::info!(url, bytes = body.len(), "downloaded supplier feed");
        Ok(body)
    }
}
