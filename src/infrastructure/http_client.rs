//! HTTP transport for the live crawl progress feed
//!
//! Wraps the backend's streaming endpoint as a [`StreamConnector`] so the
//! monitor never touches HTTP directly, plus the fire-and-forget trigger
//! endpoint that starts a crawl.

use std::pin::Pin;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::Stream;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::infrastructure::config::ApiConfig;
use crate::infrastructure::transport::{
    ProgressByteStream, StreamConnector, TransportError, TransportResult,
};

type ChunkStream = Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>;

/// Client for the backend crawl endpoints
pub struct CrawlStreamClient {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl CrawlStreamClient {
    /// Create a new client from API settings
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        // Connect timeout only: the feed stays open for the whole crawl, so
        // a total request timeout would cut healthy streams short
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid base URL: {}", config.base_url))?;

        Ok(Self {
            client,
            base_url,
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Kick off a crawl for the given source
    pub async fn trigger_crawl(&self, source_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("crawl/{source_id}"));
        tracing::info!(source_id, %url, "triggering crawl");

        let mut request = self.client.post(&url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to trigger crawl for source {source_id}"))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Crawl trigger failed with status {}: {}",
                response.status(),
                url
            );
        }

        tracing::debug!(source_id, "crawl triggered");
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

#[async_trait]
impl StreamConnector for CrawlStreamClient {
    type Stream = HttpByteStream;

    async fn open(&self, source_id: &str) -> TransportResult<HttpByteStream> {
        let url = self.endpoint(&format!("sources/{source_id}/crawl-stream"));
        tracing::info!(source_id, %url, "opening crawl progress stream");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| TransportError::connect(error.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(source_id, "🛑 stream request rejected: session expired");
            return Err(TransportError::SessionExpired);
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        tracing::debug!(source_id, status = status.as_u16(), "progress stream open");
        let chunks = response
            .bytes_stream()
            .map(|item| item.map(|bytes| bytes.to_vec()));
        Ok(HttpByteStream {
            inner: Box::pin(chunks),
        })
    }
}

/// Live byte stream over an open streaming response
pub struct HttpByteStream {
    inner: ChunkStream,
}

#[async_trait]
impl ProgressByteStream for HttpByteStream {
    async fn next_chunk(&mut self) -> TransportResult<Option<Vec<u8>>> {
        match self.inner.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(error)) => Err(TransportError::interrupted(error.to_string())),
            None => Ok(None),
        }
    }
}
