//! Per-run counters, collected by listening to the event bus.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events::{CrawlEvent, EventListener};

/// Point-in-time view of a run's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub requests_scheduled: u64,
    pub requests_sent: u64,
    pub requests_dropped: u64,
    pub responses_received: u64,
    pub items_scraped: u64,
    pub items_dropped: u64,
    pub processing_errors: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlStats {
    /// Wall time between `RunStarting` and `RunFinished`, if both were seen.
    pub fn duration(&self) -> Option<chrono::TimeDelta> {
        Some(self.finished_at? - self.started_at?)
    }
}

#[derive(Debug, Default)]
struct Timestamps {
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

/// Listener that counts events. The engine attaches a fresh one to every run.
#[derive(Debug, Default)]
pub struct StatsCollector {
    requests_scheduled: AtomicU64,
    requests_sent: AtomicU64,
    requests_dropped: AtomicU64,
    responses_received: AtomicU64,
    items_scraped: AtomicU64,
    items_dropped: AtomicU64,
    processing_errors: AtomicU64,
    timestamps: Mutex<Timestamps>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CrawlStats {
        let timestamps = self.lock_timestamps();
        CrawlStats {
            requests_scheduled: self.requests_scheduled.load(Ordering::SeqCst),
            requests_sent: self.requests_sent.load(Ordering::SeqCst),
            requests_dropped: self.requests_dropped.load(Ordering::SeqCst),
            responses_received: self.responses_received.load(Ordering::SeqCst),
            items_scraped: self.items_scraped.load(Ordering::SeqCst),
            items_dropped: self.items_dropped.load(Ordering::SeqCst),
            processing_errors: self.processing_errors.load(Ordering::SeqCst),
            started_at: timestamps.started_at,
            finished_at: timestamps.finished_at,
        }
    }

    fn lock_timestamps(&self) -> std::sync::MutexGuard<'_, Timestamps> {
        self.timestamps.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned stats mutex");
            poisoned.into_inner()
        })
    }
}

impl EventListener for StatsCollector {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        let counter = match event {
            CrawlEvent::RunStarting { .. } => {
                self.lock_timestamps().started_at = Some(Utc::now());
                return;
            }
            CrawlEvent::RunFinished { run } => {
                self.lock_timestamps().finished_at = Some(Utc::now());
                let stats = self.snapshot();
                tracing::info!(
                    run_id = %run.id,
                    sent = stats.requests_sent,
                    dropped = stats.requests_dropped,
                    received = stats.responses_received,
                    items = stats.items_scraped,
                    items_dropped = stats.items_dropped,
                    errors = stats.processing_errors,
                    duration_ms = stats.duration().map(|d| d.num_milliseconds()).unwrap_or_default(),
                    "Crawl statistics"
                );
                return;
            }
            CrawlEvent::RequestScheduling { .. } => &self.requests_scheduled,
            CrawlEvent::RequestSending { .. } => &self.requests_sent,
            CrawlEvent::RequestDropped { .. } => &self.requests_dropped,
            CrawlEvent::ResponseReceived { .. } => &self.responses_received,
            CrawlEvent::ItemScraped { .. } => &self.items_scraped,
            CrawlEvent::ItemDropped { .. } => &self.items_dropped,
            CrawlEvent::ProcessingError { .. } => &self.processing_errors,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}
