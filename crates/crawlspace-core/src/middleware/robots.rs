//! Robots exclusion compliance.
//!
//! Rules are fetched once per domain, directly through the transport, and
//! cached for the lifetime of the middleware instance (one run). Evaluation is
//! delegated to the `robotstxt` crate (Google's matcher port).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::HeaderMap;
use robotstxt::DefaultMatcher;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use url::Url;

use super::{DownloaderMiddleware, MiddlewareAction, parse_options};
use crate::error::CrawlError;
use crate::request::Request;
use crate::traits::{FetchOptions, Transport};

pub(crate) const DISALLOWED_REASON: &str = "disallowed by robots.txt";

/// What to do with a domain whose robots file could not be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchFailurePolicy {
    #[default]
    AllowAll,
    DisallowAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RobotsTxtOptions {
    /// Path of the rules file relative to the domain root.
    pub file_name: String,
    pub user_agent: String,
    pub on_fetch_failure: FetchFailurePolicy,
}

impl Default for RobotsTxtOptions {
    fn default() -> Self {
        Self {
            file_name: "robots.txt".to_string(),
            user_agent: "*".to_string(),
            on_fetch_failure: FetchFailurePolicy::default(),
        }
    }
}

/// Cached outcome of one domain's robots fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsCacheEntry {
    /// Rules file text with any leading byte-order mark removed.
    ///
    /// `robotstxt` has no reusable parsed form, so the text is parsed again
    /// by a fresh matcher on every request to the domain.
    Rules(String),
    /// The file could not be fetched (non-2xx or transport failure).
    Unavailable { reason: String },
}

impl RobotsCacheEntry {
    fn allows(&self, user_agent: &str, url: &Url, policy: FetchFailurePolicy) -> bool {
        match self {
            RobotsCacheEntry::Rules(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, user_agent, url.as_str())
            }
            RobotsCacheEntry::Unavailable { .. } => policy == FetchFailurePolicy::AllowAll,
        }
    }
}

type DomainCell = Arc<OnceCell<RobotsCacheEntry>>;

/// Drops requests that the target domain's robots rules disallow.
#[derive(Debug, Default)]
pub struct RobotsTxtMiddleware {
    options: RobotsTxtOptions,
    cache: Mutex<HashMap<String, DomainCell>>,
}

impl RobotsTxtMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RobotsTxtOptions) -> Self {
        Self {
            options,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &RobotsTxtOptions {
        &self.options
    }

    /// The cached entry for `origin`, if its robots file was already fetched.
    pub fn cached(&self, origin: &str) -> Option<RobotsCacheEntry> {
        self.lock_cache()
            .get(origin)
            .and_then(|cell| cell.get().cloned())
    }

    fn robots_url(&self, origin: &str) -> Result<Url, url::ParseError> {
        let file_name = self.options.file_name.trim_start_matches('/');
        Url::parse(&format!("{origin}/{file_name}"))
    }

    /// One cell per domain. The map lock is only held to find or insert the
    /// cell; the fetch itself runs under the cell's own initialization guard.
    fn cell_for(&self, origin: &str) -> DomainCell {
        let mut cache = self.lock_cache();
        Arc::clone(cache.entry(origin.to_string()).or_default())
    }

    async fn fetch_rules(
        &self,
        origin: &str,
        headers: &HeaderMap,
        transport: &dyn Transport,
    ) -> RobotsCacheEntry {
        let url = match self.robots_url(origin) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(%origin, error = %e, "Cannot build robots.txt URL");
                return RobotsCacheEntry::Unavailable {
                    reason: e.to_string(),
                };
            }
        };

        tracing::debug!(url = %url, "Fetching robots.txt");
        let options = FetchOptions::with_headers(headers.clone());
        match transport.fetch(&url, &options).await {
            Ok(raw) if raw.status.is_success() => {
                tracing::debug!(url = %url, bytes = raw.body.len(), "Cached robots.txt");
                let body = String::from_utf8_lossy(&raw.body);
                RobotsCacheEntry::Rules(body.trim_start_matches('\u{feff}').to_string())
            }
            Ok(raw) => {
                tracing::info!(url = %url, status = raw.status.as_u16(), "robots.txt unavailable");
                RobotsCacheEntry::Unavailable {
                    reason: format!("status {}", raw.status.as_u16()),
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "robots.txt fetch failed");
                RobotsCacheEntry::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, DomainCell>> {
        self.cache.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned robots cache");
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl DownloaderMiddleware for RobotsTxtMiddleware {
    fn name(&self) -> &'static str {
        "RobotsTxtMiddleware"
    }

    fn configure(&mut self, options: &Value) -> Result<(), CrawlError> {
        self.options = parse_options(self.name(), options)?;
        Ok(())
    }

    async fn handle_request(
        &self,
        request: Request,
        transport: &dyn Transport,
    ) -> MiddlewareAction<Request> {
        let origin = request.origin();
        let cell = self.cell_for(&origin);
        let entry = cell
            .get_or_init(|| self.fetch_rules(&origin, request.headers(), transport))
            .await;

        if entry.allows(
            &self.options.user_agent,
            request.url(),
            self.options.on_fetch_failure,
        ) {
            MiddlewareAction::Continue(request)
        } else {
            MiddlewareAction::dropped(request, DISALLOWED_REASON)
        }
    }
}
