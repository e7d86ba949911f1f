use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::error::TransportError;

/// Per-call options handed to the transport.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: HeaderMap,
    /// Overrides the transport's default timeout when set.
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    pub fn with_headers(headers: HeaderMap) -> Self {
        Self {
            headers,
            timeout: None,
        }
    }
}

/// What the transport hands back before it is tied to a [`crate::Request`].
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Performs the actual network fetch.
///
/// Every HTTP status is a successful fetch; only failures to get a response at
/// all are errors. Timeout policy lives behind this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<RawResponse, TransportError>;
}
