//! Test utilities: handwritten mocks for the transport and event listeners.
//!
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::error::TransportError;
use crate::events::{CrawlEvent, EventListener};
use crate::request::Request;
use crate::response::Response;
use crate::traits::{FetchOptions, RawResponse, Transport};

pub fn make_request(url: &str) -> Request {
    Request::from_url(url).unwrap()
}

pub fn make_response(request: Request, status: u16, body: &str) -> Response {
    Response::new(
        request,
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_string()),
        },
    )
}

/// Transport serving a robots file at `robots_path` that disallows `/test2`,
/// plus pages at `/test1` and `/test2`.
pub fn robots_transport(robots_path: &str) -> MockTransport {
    MockTransport::new()
        .with_route(robots_path, 200, "User-agent: *\nDisallow: /test2\n")
        .with_route("/test1", 200, "<html><body>test1</body></html>")
        .with_route("/test2", 200, "<html><body>test2</body></html>")
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum MockRoute {
    Respond { status: u16, body: String },
    Fail(TransportError),
}

/// One call to [`MockTransport::fetch`].
#[derive(Debug, Clone)]
pub struct FetchRecord {
    pub url: Url,
    pub headers: HeaderMap,
}

/// Transport answering from a path-keyed route table.
///
/// Unknown paths answer 404 with an empty body. Clones share routes and the
/// request log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<String, MockRoute>>>,
    log: Arc<Mutex<Vec<FetchRecord>>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(self, path: &str, status: u16, body: &str) -> Self {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            MockRoute::Respond {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    pub fn with_failure(self, path: &str, error: TransportError) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), MockRoute::Fail(error));
        self
    }

    /// Sleep for `delay` inside every fetch so concurrent callers interleave.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<FetchRecord> {
        self.log.lock().unwrap().clone()
    }

    pub fn crawled_times(&self, path: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }

    pub fn was_crawled(&self, path: &str) -> bool {
        self.crawled_times(path) > 0
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<RawResponse, TransportError> {
        self.log.lock().unwrap().push(FetchRecord {
            url: url.clone(),
            headers: options.headers.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let route = self.routes.lock().unwrap().get(url.path()).cloned();
        match route {
            Some(MockRoute::Respond { status, body }) => Ok(RawResponse {
                status: StatusCode::from_u16(status).unwrap(),
                headers: HeaderMap::new(),
                body: Bytes::from(body),
            }),
            Some(MockRoute::Fail(error)) => Err(error),
            None => Ok(RawResponse {
                status: StatusCode::NOT_FOUND,
                headers: HeaderMap::new(),
                body: Bytes::new(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingListener
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Recorded {
    name: &'static str,
    url: Option<String>,
    detail: Option<String>,
}

/// Listener that records every event it sees.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name).collect()
    }

    /// `(url, reason)` of every `RequestDropped`.
    pub fn dropped_reasons(&self) -> Vec<(String, String)> {
        self.pairs("RequestDropped")
    }

    pub fn dropped_item_reasons(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name == "ItemDropped")
            .filter_map(|e| e.detail.clone())
            .collect()
    }

    /// `(url, message)` of every `ProcessingError`.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.pairs("ProcessingError")
    }

    fn pairs(&self, name: &str) -> Vec<(String, String)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name == name)
            .filter_map(|e| Some((e.url.clone()?, e.detail.clone()?)))
            .collect()
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        let (url, detail) = match event {
            CrawlEvent::RequestScheduling { request } | CrawlEvent::RequestSending { request } => {
                (Some(request.url().to_string()), None)
            }
            CrawlEvent::ResponseReceived { response } => (Some(response.url().to_string()), None),
            CrawlEvent::RequestDropped { request, reason } => {
                (Some(request.url().to_string()), Some(reason.to_string()))
            }
            CrawlEvent::ItemDropped { reason, .. } => (None, Some(reason.to_string())),
            CrawlEvent::ProcessingError { request, error } => {
                (Some(request.url().to_string()), Some(error.to_string()))
            }
            CrawlEvent::RunStarting { .. }
            | CrawlEvent::ItemScraped { .. }
            | CrawlEvent::RunFinished { .. } => (None, None),
        };
        self.events.lock().unwrap().push(Recorded {
            name: event.name(),
            url,
            detail,
        });
    }
}
