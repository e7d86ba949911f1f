use std::sync::{Arc, Mutex};

use crawlspace_client::ReqwestTransport;
use crawlspace_core::clock::SystemClock;
use crawlspace_core::scheduler::ArrayRequestScheduler;
use crawlspace_core::{CrawlEvent, Engine, EventListener, Request};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ROBOTS_RULES: &str = "User-agent: *\nDisallow: /test2\n";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn engine() -> Engine<ArrayRequestScheduler<SystemClock>> {
    init_tracing();
    let transport = ReqwestTransport::new().expect("client builds");
    Engine::with_transport(ArrayRequestScheduler::new(SystemClock), Arc::new(transport))
}

/// Server with robots rules at `robots_path` disallowing `/test2`, and pages
/// at `/test1` and `/test2`.
pub async fn robots_server(robots_path: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_page(&server, robots_path, 200, ROBOTS_RULES).await;
    mount_page(&server, "/test1", 200, "<html><body>test1</body></html>").await;
    mount_page(&server, "/test2", 200, "<html><body>test2</body></html>").await;
    server
}

pub async fn mount_page(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_raw(body.to_string(), "text/html"))
        .mount(server)
        .await;
}

pub fn request(server: &MockServer, route: &str) -> Request {
    Request::from_url(&format!("{}{route}", server.uri())).expect("valid url")
}

/// How many requests the server received for `route`.
pub async fn received(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

/// Listener recording event names and drop reasons.
#[derive(Default)]
pub struct EventLog {
    names: Mutex<Vec<&'static str>>,
    dropped: Mutex<Vec<(String, String)>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.names.lock().unwrap().clone()
    }

    /// `(path, reason)` of every dropped request.
    pub fn dropped(&self) -> Vec<(String, String)> {
        self.dropped.lock().unwrap().clone()
    }
}

impl EventListener for EventLog {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        self.names.lock().unwrap().push(event.name());
        if let CrawlEvent::RequestDropped { request, reason } = event {
            self.dropped
                .lock()
                .unwrap()
                .push((request.path().to_string(), reason.to_string()));
        }
    }
}
