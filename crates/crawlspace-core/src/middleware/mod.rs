//! Downloader middleware: ordered stages that may rewrite or drop requests
//! before the fetch and responses after it.

mod dedup;
mod http_error;
mod robots;
mod user_agent;

pub use dedup::{RequestDeduplicationMiddleware, RequestDeduplicationOptions};
pub use http_error::{HttpErrorMiddleware, HttpErrorOptions};
pub use robots::{FetchFailurePolicy, RobotsCacheEntry, RobotsTxtMiddleware, RobotsTxtOptions};
pub use user_agent::{DEFAULT_USER_AGENT, UserAgentMiddleware, UserAgentOptions};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CrawlError;
use crate::request::Request;
use crate::response::Response;
use crate::traits::Transport;

/// Result of a single chain stage.
#[derive(Debug)]
pub enum MiddlewareAction<T> {
    /// Hand the (possibly modified) value to the next stage.
    Continue(T),
    /// Stop the chain. The value is kept so the drop can be reported.
    Drop { dropped: T, reason: String },
}

impl<T> MiddlewareAction<T> {
    pub fn dropped(dropped: T, reason: impl Into<String>) -> Self {
        Self::Drop {
            dropped,
            reason: reason.into(),
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Self::Drop { .. })
    }
}

/// A stage of the downloader chain.
///
/// Both handlers default to pass-through, so a middleware only implements the
/// side it cares about.
#[async_trait]
pub trait DownloaderMiddleware: Send + Sync {
    fn name(&self) -> &'static str;

    /// Apply user options. Called once, before the run starts.
    ///
    /// The default accepts only an empty object or `null`.
    fn configure(&mut self, options: &Value) -> Result<(), CrawlError> {
        reject_options(self.name(), options)
    }

    /// `transport` performs direct fetches that bypass the chain.
    async fn handle_request(
        &self,
        request: Request,
        transport: &dyn Transport,
    ) -> MiddlewareAction<Request> {
        let _ = transport;
        MiddlewareAction::Continue(request)
    }

    async fn handle_response(&self, response: Response) -> MiddlewareAction<Response> {
        MiddlewareAction::Continue(response)
    }
}

/// Deserialize `options` into `T`; `null` yields `T::default()`.
pub(crate) fn parse_options<T>(name: &str, options: &Value) -> Result<T, CrawlError>
where
    T: DeserializeOwned + Default,
{
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options.clone())
        .map_err(|e| CrawlError::Configuration(format!("invalid options for {name}: {e}")))
}

pub(crate) fn reject_options(name: &str, options: &Value) -> Result<(), CrawlError> {
    match options {
        Value::Null => Ok(()),
        Value::Object(map) if map.is_empty() => Ok(()),
        _ => Err(CrawlError::Configuration(format!(
            "{name} does not accept options, got {options}"
        ))),
    }
}
