//! One crawl session: seeds plus the middleware, processors and listeners
//! that apply to it.
//!
//! # Example
//!
//! ```rust
//! use crawlspace_core::middleware::RobotsTxtMiddleware;
//! use crawlspace_core::{Request, Run};
//! use serde_json::json;
//!
//! let run = Run::builder()
//!     .seed(Request::from_url("https://example.com/").unwrap())
//!     .middleware_with_options(RobotsTxtMiddleware::new(), json!({"userAgent": "crawlspace"}))
//!     .build()
//!     .unwrap();
//! assert_eq!(run.seed_count(), 1);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::CrawlError;
use crate::events::EventListener;
use crate::middleware::DownloaderMiddleware;
use crate::pipeline::ItemProcessor;
use crate::request::Request;

/// Identity of a started run, carried by `RunStarting` and `RunFinished`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub seed_count: usize,
}

impl RunInfo {
    pub(crate) fn new(seed_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            seed_count,
        }
    }
}

/// A configured, not yet started crawl session.
///
/// Consumed by [`Engine::start`](crate::Engine::start), so its middleware
/// state lives for exactly one run.
pub struct Run {
    pub(crate) seeds: Vec<Request>,
    pub(crate) middleware: Vec<Box<dyn DownloaderMiddleware>>,
    pub(crate) processors: Vec<Box<dyn ItemProcessor>>,
    pub(crate) listeners: Vec<Arc<dyn EventListener>>,
}

impl Run {
    pub fn builder() -> RunBuilder {
        RunBuilder::default()
    }

    pub fn seed_count(&self) -> usize {
        self.seeds.len()
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }
}

impl std::fmt::Debug for Run {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Run")
            .field("seeds", &self.seeds.len())
            .field("middleware", &self.middleware_names())
            .field("processors", &self.processor_names())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Collects run configuration. Options are applied in [`build`](Self::build).
#[derive(Default)]
pub struct RunBuilder {
    seeds: Vec<Request>,
    middleware: Vec<(Box<dyn DownloaderMiddleware>, Value)>,
    processors: Vec<(Box<dyn ItemProcessor>, Value)>,
    listeners: Vec<Arc<dyn EventListener>>,
}

impl RunBuilder {
    pub fn seed(mut self, request: Request) -> Self {
        self.seeds.push(request);
        self
    }

    pub fn seeds(mut self, requests: impl IntoIterator<Item = Request>) -> Self {
        self.seeds.extend(requests);
        self
    }

    pub fn middleware(self, middleware: impl DownloaderMiddleware + 'static) -> Self {
        self.middleware_with_options(middleware, Value::Null)
    }

    pub fn middleware_with_options(
        mut self,
        middleware: impl DownloaderMiddleware + 'static,
        options: Value,
    ) -> Self {
        self.middleware.push((Box::new(middleware), options));
        self
    }

    pub fn item_processor(self, processor: impl ItemProcessor + 'static) -> Self {
        self.item_processor_with_options(processor, Value::Null)
    }

    pub fn item_processor_with_options(
        mut self,
        processor: impl ItemProcessor + 'static,
        options: Value,
    ) -> Self {
        self.processors.push((Box::new(processor), options));
        self
    }

    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Configure every middleware and processor with its options.
    ///
    /// Fails with [`CrawlError::Configuration`] on the first rejected option
    /// set, before any request is processed.
    pub fn build(self) -> Result<Run, CrawlError> {
        let middleware = self
            .middleware
            .into_iter()
            .map(|(mut middleware, options)| {
                middleware.configure(&options)?;
                Ok(middleware)
            })
            .collect::<Result<Vec<_>, CrawlError>>()?;

        let processors = self
            .processors
            .into_iter()
            .map(|(mut processor, options)| {
                processor.configure(&options)?;
                Ok(processor)
            })
            .collect::<Result<Vec<_>, CrawlError>>()?;

        Ok(Run {
            seeds: self.seeds,
            middleware,
            processors,
            listeners: self.listeners,
        })
    }
}
