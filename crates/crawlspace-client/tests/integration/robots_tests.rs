use crawlspace_core::middleware::{RobotsTxtMiddleware, UserAgentMiddleware};
use crawlspace_core::{ParseResult, Run};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::common::{
    EventLog, ROBOTS_RULES, engine, mount_page, received, request, robots_server,
};

/// Seed `/test1` whose parse callback schedules `/test2`.
fn robots_run(server: &MockServer, log: std::sync::Arc<EventLog>) -> Run {
    let follow_up = request(server, "/test2");
    let seed = request(server, "/test1")
        .with_parser(move |_| vec![ParseResult::request(follow_up.clone())]);

    Run::builder()
        .seed(seed)
        .middleware_with_options(RobotsTxtMiddleware::new(), json!({"fileName": "robots"}))
        .listener(log)
        .build()
        .unwrap()
}

#[tokio::test]
async fn robots_file_is_crawled_only_once() {
    let server = robots_server("/robots").await;
    let mut engine = engine();

    engine.start(robots_run(&server, EventLog::new())).await.unwrap();

    assert_eq!(received(&server, "/robots").await, 1);
}

#[tokio::test]
async fn allowed_request_is_crawled() {
    let server = robots_server("/robots").await;
    let mut engine = engine();

    engine.start(robots_run(&server, EventLog::new())).await.unwrap();

    assert_eq!(received(&server, "/test1").await, 1);
}

#[tokio::test]
async fn disallowed_request_is_not_crawled() {
    let server = robots_server("/robots").await;
    let mut engine = engine();
    let log = EventLog::new();

    let stats = engine.start(robots_run(&server, log.clone())).await.unwrap();

    assert_eq!(received(&server, "/test2").await, 0);
    assert_eq!(
        log.dropped(),
        vec![("/test2".to_string(), "disallowed by robots.txt".to_string())]
    );
    assert_eq!(stats.requests_dropped, 1);
    assert_eq!(stats.responses_received, 1);
}

#[tokio::test]
async fn every_run_fetches_robots_again() {
    let server = robots_server("/robots").await;
    let mut engine = engine();

    engine.start(robots_run(&server, EventLog::new())).await.unwrap();
    engine.start(robots_run(&server, EventLog::new())).await.unwrap();

    assert_eq!(received(&server, "/robots").await, 2);
    assert_eq!(received(&server, "/test2").await, 0);
}

#[tokio::test]
async fn default_file_name_is_robots_txt() {
    let server = robots_server("/robots.txt").await;
    let mut engine = engine();
    let run = Run::builder()
        .seeds([
            request(&server, "/test1"),
            request(&server, "/test2"),
            request(&server, "/test1?page=2"),
        ])
        .middleware(RobotsTxtMiddleware::new())
        .build()
        .unwrap();

    let stats = engine.start(run).await.unwrap();

    assert_eq!(received(&server, "/robots.txt").await, 1);
    assert_eq!(received(&server, "/test1").await, 2);
    assert_eq!(stats.requests_dropped, 1);
}

#[tokio::test]
async fn missing_robots_file_allows_everything() {
    let server = MockServer::start().await;
    mount_page(&server, "/test2", 200, "ok").await;
    let mut engine = engine();
    let run = Run::builder()
        .seed(request(&server, "/test2"))
        .middleware(RobotsTxtMiddleware::new())
        .build()
        .unwrap();

    engine.start(run).await.unwrap();

    // unmatched routes answer 404
    assert_eq!(received(&server, "/robots.txt").await, 1);
    assert_eq!(received(&server, "/test2").await, 1);
}

#[tokio::test]
async fn failing_robots_file_can_disallow_everything() {
    let server = MockServer::start().await;
    mount_page(&server, "/robots.txt", 500, "").await;
    mount_page(&server, "/test1", 200, "ok").await;
    let mut engine = engine();
    let log = EventLog::new();
    let run = Run::builder()
        .seeds([request(&server, "/test1"), request(&server, "/test1#again")])
        .middleware_with_options(
            RobotsTxtMiddleware::new(),
            json!({"onFetchFailure": "disallowAll"}),
        )
        .listener(log.clone())
        .build()
        .unwrap();

    engine.start(run).await.unwrap();

    assert_eq!(received(&server, "/robots.txt").await, 1);
    assert_eq!(received(&server, "/test1").await, 0);
    assert_eq!(log.dropped().len(), 2);
}

#[tokio::test]
async fn robots_fetch_carries_configured_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .and(header("user-agent", "PoliteBot/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ROBOTS_RULES))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/test1", 200, "ok").await;
    let mut engine = engine();
    let run = Run::builder()
        .seed(request(&server, "/test1"))
        .middleware_with_options(UserAgentMiddleware::new(), json!({"userAgent": "PoliteBot/1.0"}))
        .middleware_with_options(RobotsTxtMiddleware::new(), json!({"userAgent": "PoliteBot"}))
        .build()
        .unwrap();

    engine.start(run).await.unwrap();

    assert_eq!(received(&server, "/test1").await, 1);
    server.verify().await;
}
