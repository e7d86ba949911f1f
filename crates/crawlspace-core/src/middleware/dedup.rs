use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{DownloaderMiddleware, MiddlewareAction, parse_options};
use crate::error::CrawlError;
use crate::request::{Request, origin_of};
use crate::traits::Transport;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RequestDeduplicationOptions {
    pub ignore_url_fragments: bool,
    pub ignore_trailing_slashes: bool,
    pub ignore_query_string: bool,
}

impl Default for RequestDeduplicationOptions {
    fn default() -> Self {
        Self {
            ignore_url_fragments: false,
            ignore_trailing_slashes: true,
            ignore_query_string: false,
        }
    }
}

/// Drops requests whose normalized URL was already sent in this run.
#[derive(Debug, Default)]
pub struct RequestDeduplicationMiddleware {
    options: RequestDeduplicationOptions,
    seen: Mutex<HashSet<String>>,
}

impl RequestDeduplicationMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    fn fingerprint(&self, url: &Url) -> String {
        let mut key = origin_of(url);

        let path = url.path();
        if self.options.ignore_trailing_slashes {
            key.push_str(path.trim_end_matches('/'));
        } else {
            key.push_str(path);
        }

        if let Some(query) = url.query().filter(|_| !self.options.ignore_query_string) {
            key.push('?');
            key.push_str(query);
        }
        if let Some(fragment) = url.fragment().filter(|_| !self.options.ignore_url_fragments) {
            key.push('#');
            key.push_str(fragment);
        }
        key
    }
}

#[async_trait]
impl DownloaderMiddleware for RequestDeduplicationMiddleware {
    fn name(&self) -> &'static str {
        "RequestDeduplicationMiddleware"
    }

    fn configure(&mut self, options: &Value) -> Result<(), CrawlError> {
        self.options = parse_options(self.name(), options)?;
        Ok(())
    }

    async fn handle_request(
        &self,
        request: Request,
        _transport: &dyn Transport,
    ) -> MiddlewareAction<Request> {
        let key = self.fingerprint(request.url());
        let first_visit = self
            .seen
            .lock()
            .unwrap_or_else(|poisoned| {
                tracing::warn!("Recovered from poisoned dedup set");
                poisoned.into_inner()
            })
            .insert(key);

        if first_visit {
            MiddlewareAction::Continue(request)
        } else {
            tracing::debug!(url = %request.url(), "Dropping duplicate request");
            MiddlewareAction::dropped(request, "duplicate request")
        }
    }
}
