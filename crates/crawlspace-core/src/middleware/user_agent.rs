use async_trait::async_trait;
use http::HeaderValue;
use http::header::USER_AGENT;
use serde::Deserialize;
use serde_json::Value;

use super::{DownloaderMiddleware, MiddlewareAction, parse_options};
use crate::error::CrawlError;
use crate::request::Request;
use crate::traits::Transport;

/// Sent when neither the run nor the transport configures one.
pub const DEFAULT_USER_AGENT: &str = concat!("crawlspace/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct UserAgentOptions {
    pub user_agent: String,
}

impl Default for UserAgentOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Sets the `User-Agent` header on every outgoing request.
#[derive(Debug, Clone)]
pub struct UserAgentMiddleware {
    header: HeaderValue,
}

impl UserAgentMiddleware {
    pub fn new() -> Self {
        Self {
            header: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }

    pub fn user_agent(&self) -> &str {
        self.header.to_str().unwrap_or_default()
    }
}

impl Default for UserAgentMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DownloaderMiddleware for UserAgentMiddleware {
    fn name(&self) -> &'static str {
        "UserAgentMiddleware"
    }

    fn configure(&mut self, options: &Value) -> Result<(), CrawlError> {
        let options: UserAgentOptions = parse_options(self.name(), options)?;
        self.header = HeaderValue::from_str(&options.user_agent).map_err(|e| {
            CrawlError::Configuration(format!(
                "invalid user agent '{}': {e}",
                options.user_agent
            ))
        })?;
        Ok(())
    }

    async fn handle_request(
        &self,
        mut request: Request,
        _transport: &dyn Transport,
    ) -> MiddlewareAction<Request> {
        request.headers_mut().insert(USER_AGENT, self.header.clone());
        MiddlewareAction::Continue(request)
    }
}
