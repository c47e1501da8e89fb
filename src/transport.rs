//! HTTP client abstraction.
//!
//! The downloader only needs two calls from the network: a HEAD to learn the
//! resource length and a ranged GET per chunk. Keeping them behind a trait
//! lets tests swap in a mock that counts calls or injects failures.

use std::future::Future;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::{header, Client};

use crate::config::DownloaderConfig;
use crate::error::{DownloadError, Result};

/// Status and headers of a HEAD request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResponse {
    pub status: u16,
    /// Parsed `Content-Length`, `None` when absent or malformed.
    pub content_length: Option<u64>,
}

/// A fully buffered response to a ranged GET.
#[derive(Debug, Clone)]
pub struct RangeResponse {
    pub status: u16,
    /// Declared `Content-Length`, informational only.
    pub content_length: Option<u64>,
    pub body: Bytes,
}

pub trait HttpClient: Send + Sync + 'static {
    /// Issue a HEAD request. Transport failures map to
    /// [`DownloadError::Network`]; the status is returned unchecked.
    fn head(&self, url: &str) -> impl Future<Output = Result<HeadResponse>> + Send;

    /// Issue a GET carrying `Range: <range>` and buffer the whole body.
    fn get_range(
        &self,
        url: &str,
        range: &str,
    ) -> impl Future<Output = Result<RangeResponse>> + Send;
}

/// Production client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(config: &DownloaderConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DownloadError::ClientSetup(e.to_string()))?;
        Ok(Self { client })
    }
}

fn parse_content_length(headers: &header::HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

impl HttpClient for ReqwestClient {
    async fn head(&self, url: &str) -> Result<HeadResponse> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        Ok(HeadResponse {
            status: response.status().as_u16(),
            content_length: parse_content_length(response.headers()),
        })
    }

    async fn get_range(&self, url: &str, range: &str) -> Result<RangeResponse> {
        let response = self
            .client
            .get(url)
            .header(header::RANGE, range)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status().as_u16();
        let content_length = parse_content_length(response.headers());

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(item) = stream.next().await {
            let chunk = item.map_err(|e| DownloadError::network(url, e))?;
            body.extend_from_slice(&chunk);
        }

        Ok(RangeResponse {
            status,
            content_length,
            body: body.freeze(),
        })
    }
}
