use crate::config::FetchConfig;
use crate::timestamp::normalize_utc;
use crate::types::{FeedRequest, FeedSource, FetchError, RawEntry};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use feed_rs::parser;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Fetches feeds over HTTP(S) and parses them with feed-rs.
pub struct HttpFeedSource {
    client: Client,
    config: FetchConfig,
}

impl HttpFeedSource {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn fetch_body(&self, request: &FeedRequest) -> Result<Vec<u8>, FetchError> {
        let start_time = Instant::now();

        let retry_delay = Duration::from_secs(self.config.retry_delay_seconds);
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: retry_delay,
            initial_interval: retry_delay,
            max_interval: retry_delay.saturating_mul(8),
            multiplier: 2.0,
            max_elapsed_time: Some(
                Duration::from_secs(self.config.timeout_seconds).saturating_mul(4),
            ),
            ..Default::default()
        };

        let mut last_error = FetchError::Transport("no attempt made".to_string());

        for attempt in 0..=self.config.max_retries {
            let mut builder = self.client.get(&request.url);
            if let Some(credentials) = &request.credentials {
                builder = builder.basic_auth(&credentials.username, credentials.password.as_ref());
            }

            let retryable = match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response
                            .bytes()
                            .await
                            .map_err(|e| FetchError::Transport(e.to_string()))?;
                        info!(
                            "Fetched {} ({} bytes in {} ms)",
                            request.url,
                            body.len(),
                            start_time.elapsed().as_millis()
                        );
                        return Ok(body.to_vec());
                    }

                    last_error = FetchError::Status(status.as_u16());
                    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
                }
                Err(e) => {
                    last_error = FetchError::Transport(e.to_string());
                    true
                }
            };

            if !retryable || attempt == self.config.max_retries {
                break;
            }
            match backoff.next_backoff() {
                Some(delay) => {
                    warn!(
                        "Attempt {} failed for {}, retrying in {:?}",
                        attempt + 1,
                        request.url,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                None => break,
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, request: &FeedRequest) -> Result<Vec<RawEntry>, FetchError> {
        debug!("Fetching feed: {}", request.url);
        let body = self.fetch_body(request).await?;
        parse_feed_document(&body)
    }
}

/// Turn an RSS/Atom document into raw entries.
///
/// feed-rs resolves dates itself, so it is given the same timestamp
/// normalizer the processor uses. The published string handed on is that
/// instant in RFC 2822 form, or `None` when the date was absent or unusable.
pub fn parse_feed_document(content: &[u8]) -> Result<Vec<RawEntry>, FetchError> {
    let feed = parser::Builder::new()
        .timestamp_parser(normalize_utc)
        .build()
        .parse(content)
        .map_err(|e| FetchError::Parse(e.to_string()))?;

    let entries: Vec<RawEntry> = feed
        .entries
        .into_iter()
        .map(|entry| {
            let description = entry
                .summary
                .map(|summary| summary.content)
                .or_else(|| entry.content.and_then(|content| content.body))
                .unwrap_or_default();

            RawEntry {
                title: entry.title.map(|title| title.content).unwrap_or_default(),
                description,
                published: entry.published.or(entry.updated).map(|instant| instant.to_rfc2822()),
            }
        })
        .collect();

    debug!("Parsed feed with {} entries", entries.len());
    Ok(entries)
}
