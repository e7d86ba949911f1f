use thiserror::Error;

/// Failures raised by the transport while fetching a URL.
///
/// These never abort a run: the downloader turns them into a dropped request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Request timed out.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Connection could not be established or was reset.
    #[error("network error: {0}")]
    Network(String),

    /// Any other HTTP-level failure (bad response, body read error, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The URL cannot be fetched by this transport.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Engine-level errors.
///
/// Only configuration errors and scheduler misuse are fatal to a run; everything
/// that goes wrong with a single request is reported through events instead.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The scheduler was asked for a request while empty.
    #[error("scheduler has no pending requests")]
    EmptyScheduler,

    /// Invalid middleware, processor or client configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A URL could not be parsed into a request target.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failure raised by a parse callback while producing results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("invalid JSON: {e}"))
    }
}
