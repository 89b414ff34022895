use crate::error::{DotupError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Official release metadata index listing all published channels
pub const DEFAULT_INDEX_URL: &str =
    "https://builds.dotnet.microsoft.com/dotnet/release-metadata/releases-index.json";

/// Explicit retry policy for index fetches. Transient failures (network
/// errors, 5xx responses) are retried with a linear backoff; anything the
/// server answered definitively is not.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[derive(Debug, Deserialize)]
pub struct ReleasesIndex {
    #[serde(rename = "releases-index")]
    pub releases_index: Vec<ReleaseIndexEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseIndexEntry {
    #[serde(rename = "channel-version")]
    pub channel_version: String,
}

pub struct ReleasesIndexApi {
    client: Client,
    index_url: String,
    retry: RetryPolicy,
}

impl ReleasesIndexApi {
    pub fn new<T: Into<String>>(index_url: T, retry: RetryPolicy) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!(
                    env!("CARGO_PKG_NAME"),
                    "/",
                    env!("CARGO_PKG_VERSION")
                ))
                .build()
                .unwrap(),
            index_url: index_url.into(),
            retry,
        }
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    /// Fetch the releases index, fresh on every call
    pub async fn fetch_index(&self) -> Result<ReleasesIndex> {
        let mut attempt = 1;

        loop {
            match self.fetch_once().await {
                Ok(index) => return Ok(index),
                Err(error) => {
                    if attempt >= self.retry.max_attempts || !is_transient(&error) {
                        return Err(error);
                    }

                    tracing::warn!(
                        "Releases index fetch attempt {} of {} failed: {}",
                        attempt,
                        self.retry.max_attempts,
                        error
                    );
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<ReleasesIndex> {
        let response = self
            .client
            .get(&self.index_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| DotupError::DownloadFailed {
                url: self.index_url.clone(),
                source: e,
            })?;

        let body = response.text().await?;
        let index: ReleasesIndex = serde_json::from_str(&body)?;
        Ok(index)
    }

    /// Expand a bare major version to its latest published `A.B` channel.
    ///
    /// The index is ordered newest-first, so the first entry with a
    /// matching major component is the answer. A well-formed index with no
    /// matching entry is a hard error naming the major and the index URL,
    /// never a retry or a silent fallback.
    pub async fn resolve_channel(&self, major: &str) -> Result<String> {
        let index = self.fetch_index().await?;

        index
            .releases_index
            .iter()
            .find(|entry| entry.channel_version.split('.').next() == Some(major))
            .map(|entry| entry.channel_version.clone())
            .ok_or_else(|| DotupError::ChannelNotFound {
                major: major.to_string(),
                url: self.index_url.clone(),
            })
    }
}

fn is_transient(error: &DotupError) -> bool {
    match error {
        DotupError::DownloadFailed { source, .. } => {
            source.status().map_or(true, |status| status.is_server_error())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    const INDEX_BODY: &str = r#"{
        "releases-index": [
            { "channel-version": "8.0" },
            { "channel-version": "7.0" },
            { "channel-version": "3.1" },
            { "channel-version": "3.0" }
        ]
    }"#;

    #[tokio::test]
    async fn test_resolve_channel_picks_first_matching_major() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/releases-index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(INDEX_BODY)
            .expect(2)
            .create_async()
            .await;

        let api = ReleasesIndexApi::new(
            format!("{}/releases-index.json", server.url()),
            fast_retry(),
        );

        assert_eq!(api.resolve_channel("3").await.unwrap(), "3.1");
        assert_eq!(api.resolve_channel("8").await.unwrap(), "8.0");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_channel_missing_major_names_major_and_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/releases-index.json")
            .with_status(200)
            .with_body(INDEX_BODY)
            .expect(1)
            .create_async()
            .await;

        let url = format!("{}/releases-index.json", server.url());
        let api = ReleasesIndexApi::new(url.clone(), fast_retry());

        match api.resolve_channel("9").await {
            Err(DotupError::ChannelNotFound { major, url: index_url }) => {
                assert_eq!(major, "9");
                assert_eq!(index_url, url);
            }
            other => panic!("expected ChannelNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_server_errors_retried_up_to_policy_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/releases-index.json")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let api = ReleasesIndexApi::new(
            format!("{}/releases-index.json", server.url()),
            fast_retry(),
        );

        assert!(api.fetch_index().await.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/releases-index.json")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let api = ReleasesIndexApi::new(
            format!("{}/releases-index.json", server.url()),
            fast_retry(),
        );

        assert!(api.fetch_index().await.is_err());
        mock.assert_async().await;
    }
}
