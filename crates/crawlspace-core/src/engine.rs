//! The crawl loop.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example(transport: std::sync::Arc<dyn crawlspace_core::Transport>) -> Result<(), crawlspace_core::CrawlError> {
//! use crawlspace_core::clock::SystemClock;
//! use crawlspace_core::middleware::RobotsTxtMiddleware;
//! use crawlspace_core::scheduler::ArrayRequestScheduler;
//! use crawlspace_core::{Engine, Request, Run};
//!
//! let mut engine = Engine::with_transport(ArrayRequestScheduler::new(SystemClock), transport);
//! let run = Run::builder()
//!     .seed(Request::from_url("https://example.com/")?)
//!     .middleware(RobotsTxtMiddleware::new())
//!     .build()?;
//! let stats = engine.start(run).await?;
//! println!("{} responses", stats.responses_received);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::downloader::{Downloader, Outcome};
use crate::error::CrawlError;
use crate::events::{CrawlEvent, EventBus, ListenerId};
use crate::item::Item;
use crate::pipeline::ItemPipeline;
use crate::processor::Processor;
use crate::run::{Run, RunInfo};
use crate::scheduler::RequestScheduler;
use crate::stats::{CrawlStats, StatsCollector};
use crate::traits::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Finished,
}

/// Pulls requests from the scheduler and drives each one to completion
/// before pulling the next.
///
/// An engine can execute several runs one after another. Each run brings its
/// own middleware, processors and listeners, which are removed again when it
/// finishes.
#[derive(Debug)]
pub struct Engine<S> {
    scheduler: S,
    downloader: Downloader,
    processor: Processor,
    pipeline: ItemPipeline,
    events: EventBus,
    state: EngineState,
}

impl<S: RequestScheduler> Engine<S> {
    /// Assemble an engine from explicit components. They should all publish
    /// to `events`.
    pub fn new(
        scheduler: S,
        downloader: Downloader,
        processor: Processor,
        pipeline: ItemPipeline,
        events: EventBus,
    ) -> Self {
        Self {
            scheduler,
            downloader,
            processor,
            pipeline,
            events,
            state: EngineState::Idle,
        }
    }

    /// Default wiring around a single shared event bus.
    pub fn with_transport(scheduler: S, transport: Arc<dyn Transport>) -> Self {
        let events = EventBus::new();
        Self::new(
            scheduler,
            Downloader::new(transport, events.clone()),
            Processor::new(events.clone()),
            ItemPipeline::new(events.clone()),
            events,
        )
    }

    /// The bus shared by every component. Listeners subscribed here outlive
    /// individual runs.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Execute `run` until the scheduler is empty and return its statistics.
    pub async fn start(&mut self, run: Run) -> Result<CrawlStats, CrawlError> {
        let (stats, _) = self.execute(run, false).await?;
        Ok(stats)
    }

    /// Like [`start`](Self::start), but returns every item that completed
    /// the pipeline, in scrape order.
    pub async fn collect(&mut self, run: Run) -> Result<Vec<Item>, CrawlError> {
        let (_, items) = self.execute(run, true).await?;
        Ok(items)
    }

    async fn execute(
        &mut self,
        run: Run,
        collect: bool,
    ) -> Result<(CrawlStats, Vec<Item>), CrawlError> {
        let Run {
            seeds,
            middleware,
            processors,
            listeners,
        } = run;

        let info = RunInfo::new(seeds.len());
        let stats = Arc::new(StatsCollector::new());
        let mut subscriptions: Vec<ListenerId> = vec![self.events.subscribe(stats.clone())];
        subscriptions.extend(listeners.into_iter().map(|l| self.events.subscribe(l)));
        self.downloader.set_middleware(middleware);
        self.pipeline.set_processors(processors);

        self.state = EngineState::Running;
        tracing::debug!(run_id = %info.id, seeds = info.seed_count, "Engine running");
        self.events.publish(CrawlEvent::RunStarting { run: &info });

        for seed in seeds {
            self.events
                .publish(CrawlEvent::RequestScheduling { request: &seed });
            self.scheduler.schedule(seed);
        }

        let mut items = Vec::new();
        let result = self.drain(&mut items, collect).await;

        self.state = EngineState::Finished;
        self.events.publish(CrawlEvent::RunFinished { run: &info });

        for id in subscriptions {
            self.events.unsubscribe(id);
        }
        self.downloader.clear_middleware();
        self.pipeline.clear_processors();
        self.scheduler.clear();

        result?;
        Ok((stats.snapshot(), items))
    }

    async fn drain(&mut self, items: &mut Vec<Item>, collect: bool) -> Result<(), CrawlError> {
        while !self.scheduler.is_empty() {
            let request = self.scheduler.next_request().await?;
            match self.downloader.download(request).await {
                Outcome::Completed(response) => {
                    let scraped = self
                        .processor
                        .process(response, &mut self.scheduler, &self.pipeline)
                        .await;
                    if collect {
                        items.extend(scraped);
                    }
                }
                Outcome::Dropped(_) => {}
            }
        }
        Ok(())
    }
}
