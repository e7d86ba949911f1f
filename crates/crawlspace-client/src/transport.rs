use async_trait::async_trait;
use crawlspace_core::error::{CrawlError, TransportError};
use crawlspace_core::traits::{FetchOptions, RawResponse, Transport};
use reqwest::Client;
use url::Url;

use crate::config::ClientConfig;

/// HTTP transport using reqwest.
///
/// Every status code is returned as a response; deciding what counts as a
/// failure is left to middleware. Only network-level problems are errors.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, CrawlError> {
        Self::with_config(ClientConfig::default())
    }

    /// Build from `CRAWLSPACE_*` environment variables.
    pub fn from_env() -> Result<Self, CrawlError> {
        Self::with_config(ClientConfig::from_env()?)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| CrawlError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<RawResponse, TransportError> {
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(TransportError::InvalidUrl(format!(
                    "URL scheme '{scheme}' is not supported (only http/https): {url}"
                )));
            }
        }

        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let mut builder = self
            .client
            .get(url.clone())
            .headers(options.headers.clone());
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(timeout.as_secs())
            } else if e.is_connect() {
                TransportError::Network(format!("Connection failed: {e}"))
            } else {
                TransportError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(timeout.as_secs())
            } else {
                TransportError::Http(format!("Failed to read response body: {e}"))
            }
        })?;

        tracing::debug!(%url, status = status.as_u16(), bytes = body.len(), "Fetched");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
