pub mod clock;
pub mod downloader;
pub mod engine;
pub mod error;
pub mod events;
pub mod item;
pub mod middleware;
pub mod parse;
pub mod pipeline;
pub mod processor;
pub mod request;
pub mod response;
pub mod run;
pub mod scheduler;
pub mod stats;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::{Engine, EngineState};
pub use error::{CrawlError, ParseError, TransportError};
pub use events::{CrawlEvent, EventBus, EventListener, ListenerId, TracingListener};
pub use item::Item;
pub use middleware::{DownloaderMiddleware, MiddlewareAction};
pub use parse::{ParseResult, ParseResults};
pub use pipeline::{ItemPipeline, ItemProcessor};
pub use request::{Meta, Request};
pub use response::Response;
pub use run::{Run, RunBuilder, RunInfo};
pub use stats::{CrawlStats, StatsCollector};
pub use traits::{FetchOptions, RawResponse, Transport};
