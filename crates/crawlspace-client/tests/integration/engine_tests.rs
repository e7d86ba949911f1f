use crawlspace_core::middleware::{HttpErrorMiddleware, RequestDeduplicationMiddleware};
use crawlspace_core::pipeline::ItemDeduplicationProcessor;
use crawlspace_core::{CrawlError, Item, ParseError, ParseResult, Request, Response, Run};
use scraper::{Html, Selector};
use serde_json::json;

use crate::integration::common::{EventLog, engine, mount_page, received, request};

const INDEX: &str = r#"<html><head><title>Index</title></head><body>
<a href="/a">A</a> <a href="/b">B</a> <a href="/a#top">A again</a> <a href="/broken">Broken</a>
</body></html>"#;
const PAGE_A: &str = r#"<html><head><title>Page A</title></head><body><a href="/">home</a></body></html>"#;
const PAGE_B: &str = r#"<html><head><title>Page B</title></head><body><a href="/b/">self</a></body></html>"#;

/// Emit the page title as an item and follow every link.
fn follow_links(response: Response) -> Vec<Result<ParseResult, ParseError>> {
    let document = Html::parse_document(&response.text());
    let title = Selector::parse("title").expect("valid selector");
    let links = Selector::parse("a[href]").expect("valid selector");

    let mut results = Vec::new();
    if let Some(title) = document.select(&title).next() {
        let item = Item::new()
            .with("url", response.url().as_str())
            .with("title", title.text().collect::<String>());
        results.push(ParseResult::item(item));
    }
    for link in document.select(&links) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        match response.url().join(href) {
            Ok(url) => results.push(ParseResult::request(Request::new(url).with_parser(follow_links))),
            Err(e) => {
                results.push(Err(ParseError::new(format!("bad link '{href}': {e}"))));
                break;
            }
        }
    }
    results
}

#[tokio::test]
async fn crawls_a_small_site_once_per_page() {
    let server = wiremock::MockServer::start().await;
    mount_page(&server, "/", 200, INDEX).await;
    mount_page(&server, "/a", 200, PAGE_A).await;
    mount_page(&server, "/b", 200, PAGE_B).await;
    mount_page(&server, "/broken", 500, "oops").await;
    let mut engine = engine();
    let log = EventLog::new();

    let run = Run::builder()
        .seed(request(&server, "/").with_parser(follow_links))
        .middleware_with_options(
            RequestDeduplicationMiddleware::new(),
            json!({"ignoreUrlFragments": true}),
        )
        .middleware(HttpErrorMiddleware::new())
        .item_processor_with_options(ItemDeduplicationProcessor::default(), json!({"fields": ["title"]}))
        .listener(log.clone())
        .build()
        .unwrap();

    let items = engine.collect(run).await.unwrap();

    let titles: Vec<_> = items.iter().map(|i| i.get("title").unwrap().clone()).collect();
    assert_eq!(titles, vec!["Index", "Page A", "Page B"]);
    for route in ["/", "/a", "/b", "/broken"] {
        assert_eq!(received(&server, route).await, 1, "{route} fetched once");
    }

    let reasons: Vec<_> = log.dropped().into_iter().map(|(_, reason)| reason).collect();
    assert!(reasons.contains(&"duplicate request".to_string()));
    assert!(reasons.contains(&"unsuccessful response status 500".to_string()));
    assert_eq!(log.names().first(), Some(&"RunStarting"));
    assert_eq!(log.names().last(), Some(&"RunFinished"));
}

#[tokio::test]
async fn unreachable_host_is_dropped_not_fatal() {
    let server = wiremock::MockServer::start().await;
    mount_page(&server, "/", 200, "ok").await;
    let mut engine = engine();
    let log = EventLog::new();

    let run = Run::builder()
        .seed(Request::from_url("http://127.0.0.1:9/unreachable").unwrap())
        .seed(request(&server, "/"))
        .listener(log.clone())
        .build()
        .unwrap();

    let stats = engine.start(run).await.unwrap();

    assert_eq!(stats.requests_dropped, 1);
    assert_eq!(stats.responses_received, 1);
    let (_, reason) = &log.dropped()[0];
    assert!(reason.starts_with("fetch-error:"), "got {reason}");
}

#[tokio::test]
async fn invalid_options_fail_before_any_request() {
    let server = wiremock::MockServer::start().await;

    let err = Run::builder()
        .seed(request(&server, "/"))
        .middleware_with_options(HttpErrorMiddleware::new(), json!({"handleStatus": "404"}))
        .build()
        .unwrap_err();

    assert!(matches!(err, CrawlError::Configuration(_)));
    assert_eq!(received(&server, "/").await, 0);
}
