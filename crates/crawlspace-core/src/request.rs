use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::HeaderMap;
use url::Url;

use crate::error::{CrawlError, ParseError};
use crate::parse::{ParseCallback, ParseResult, ParseResults};
use crate::response::Response;

/// Key-value bag that carries middleware-local state across a request's lifetime.
pub type Meta = HashMap<String, serde_json::Value>;

/// A unit of crawl work: a target URL plus the callback that turns its response
/// into follow-up requests and items.
#[derive(Clone)]
pub struct Request {
    url: Url,
    headers: HeaderMap,
    meta: Meta,
    priority: i32,
    parse: ParseCallback,
}

impl Request {
    /// Create a request whose response yields nothing when parsed.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
            meta: Meta::new(),
            priority: 0,
            parse: Arc::new(|_: Response| -> ParseResults { Box::new(std::iter::empty()) }),
        }
    }

    /// Parse `url` and create a request for it.
    pub fn from_url(url: &str) -> Result<Self, CrawlError> {
        let parsed = Url::parse(url).map_err(|e| CrawlError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(parsed))
    }

    /// Attach the parse callback invoked with this request's response.
    ///
    /// The callback may return any iterator; it is drained lazily, in order,
    /// exactly once per response.
    pub fn with_parser<F, I>(mut self, parser: F) -> Self
    where
        F: Fn(Response) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = Result<ParseResult, ParseError>>,
        I::IntoIter: Send + 'static,
    {
        self.parse = Arc::new(move |response| -> ParseResults {
            Box::new(parser(response).into_iter())
        });
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn with_header(mut self, name: http::header::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// The `scheme://host[:port]` key this request's domain is tracked under.
    ///
    /// The port is only included when the URL names one explicitly.
    pub fn origin(&self) -> String {
        origin_of(&self.url)
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn get_meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.meta.get(key)
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.meta.insert(key.into(), value);
    }

    pub(crate) fn parser(&self) -> ParseCallback {
        Arc::clone(&self.parse)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url.as_str())
            .field("priority", &self.priority)
            .field("headers", &self.headers)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

pub(crate) fn origin_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}
