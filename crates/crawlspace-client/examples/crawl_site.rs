//! Crawl a single site politely and print every page title as JSON.
//!
//! ```sh
//! cargo run -p crawlspace-client --example crawl_site -- --url https://example.com --max-depth 2
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use scraper::{Html, Selector};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use url::Url;

use crawlspace_client::{ClientConfig, ReqwestTransport};
use crawlspace_core::clock::SystemClock;
use crawlspace_core::middleware::{
    HttpErrorMiddleware, RequestDeduplicationMiddleware, RobotsTxtMiddleware, UserAgentMiddleware,
};
use crawlspace_core::scheduler::{ArrayRequestScheduler, SchedulerConfig};
use crawlspace_core::{Engine, Item, ParseError, ParseResult, Request, Response, Run, TracingListener};

#[derive(Parser)]
#[command(name = "crawl_site", about = "Crawl one site and print page titles")]
struct Cli {
    /// Start URL. Only links on the same host are followed.
    #[arg(short, long)]
    url: Url,

    /// How many links deep to follow from the start page
    #[arg(long, default_value_t = 1)]
    max_depth: u64,

    /// Minimum delay between requests to the same host
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,

    /// User agent for requests and robots.txt matching
    #[arg(long, env = "CRAWLSPACE_USER_AGENT", default_value = "crawlspace-example")]
    user_agent: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("crawlspace=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::from_env()?.with_user_agent(cli.user_agent.clone());
    let transport = ReqwestTransport::with_config(config).context("Failed to build transport")?;
    let scheduler = ArrayRequestScheduler::with_config(
        SystemClock,
        SchedulerConfig::new(Duration::from_millis(cli.delay_ms)),
    );
    let mut engine = Engine::with_transport(scheduler, Arc::new(transport));

    let run = Run::builder()
        .seed(page_request(cli.url, 0, cli.max_depth))
        .middleware_with_options(UserAgentMiddleware::new(), json!({"userAgent": cli.user_agent}))
        .middleware_with_options(RobotsTxtMiddleware::new(), json!({"userAgent": cli.user_agent}))
        .middleware(RequestDeduplicationMiddleware::new())
        .middleware(HttpErrorMiddleware::new())
        .listener(Arc::new(TracingListener))
        .build()?;

    for item in engine.collect(run).await? {
        println!("{}", serde_json::to_string(&item)?);
    }
    Ok(())
}

fn page_request(url: Url, depth: u64, max_depth: u64) -> Request {
    Request::new(url)
        .with_meta("depth", json!(depth))
        .with_parser(move |response| parse_page(response, max_depth))
}

fn parse_page(response: Response, max_depth: u64) -> Vec<Result<ParseResult, ParseError>> {
    let depth = response
        .get_meta("depth")
        .and_then(|d| d.as_u64())
        .unwrap_or_default();
    let document = Html::parse_document(&response.text());
    let (Ok(title), Ok(links)) = (Selector::parse("title"), Selector::parse("a[href]")) else {
        return vec![Err(ParseError::new("invalid selector"))];
    };

    let title: String = document
        .select(&title)
        .next()
        .map(|t| t.text().collect())
        .unwrap_or_default();
    let mut results = vec![ParseResult::item(
        Item::new()
            .with("url", response.url().as_str())
            .with("depth", depth)
            .with("title", title.trim()),
    )];

    if depth >= max_depth {
        return results;
    }
    for href in document.select(&links).filter_map(|a| a.value().attr("href")) {
        let Ok(mut url) = response.url().join(href) else {
            continue;
        };
        if url.host_str() != response.url().host_str() {
            continue;
        }
        url.set_fragment(None);
        results.push(ParseResult::request(page_request(url, depth + 1, max_depth)));
    }
    results
}
