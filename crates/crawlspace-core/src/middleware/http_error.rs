use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{DownloaderMiddleware, MiddlewareAction, parse_options};
use crate::error::CrawlError;
use crate::response::Response;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct HttpErrorOptions {
    /// Non-2xx statuses that are still handed to the parse callback.
    pub handle_status: Vec<u16>,
}

/// Drops responses with a non-2xx status.
#[derive(Debug, Default)]
pub struct HttpErrorMiddleware {
    options: HttpErrorOptions,
}

impl HttpErrorMiddleware {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DownloaderMiddleware for HttpErrorMiddleware {
    fn name(&self) -> &'static str {
        "HttpErrorMiddleware"
    }

    fn configure(&mut self, options: &Value) -> Result<(), CrawlError> {
        self.options = parse_options(self.name(), options)?;
        Ok(())
    }

    async fn handle_response(&self, response: Response) -> MiddlewareAction<Response> {
        let status = response.status().as_u16();
        if response.is_success() || self.options.handle_status.contains(&status) {
            return MiddlewareAction::Continue(response);
        }
        MiddlewareAction::dropped(response, format!("unsuccessful response status {status}"))
    }
}
