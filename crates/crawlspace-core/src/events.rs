//! Lifecycle notifications.
//!
//! Components receive an [`EventBus`] handle at construction and publish
//! [`CrawlEvent`]s through it. Listeners are pure observers: a crawl behaves
//! the same with or without them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::ParseError;
use crate::item::Item;
use crate::request::Request;
use crate::response::Response;
use crate::run::RunInfo;

/// Events emitted during a run.
///
/// For one request the order is always `RequestSending`, then one of
/// `RequestDropped` / `ResponseReceived`, then any number of item events.
#[derive(Debug, Clone, Copy)]
pub enum CrawlEvent<'a> {
    RunStarting {
        run: &'a RunInfo,
    },
    RequestScheduling {
        request: &'a Request,
    },
    RequestSending {
        request: &'a Request,
    },
    ResponseReceived {
        response: &'a Response,
    },
    RequestDropped {
        request: &'a Request,
        reason: &'a str,
    },
    ItemScraped {
        item: &'a Item,
    },
    ItemDropped {
        item: &'a Item,
        reason: &'a str,
    },
    ProcessingError {
        request: &'a Request,
        error: &'a ParseError,
    },
    RunFinished {
        run: &'a RunInfo,
    },
}

impl CrawlEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            CrawlEvent::RunStarting { .. } => "RunStarting",
            CrawlEvent::RequestScheduling { .. } => "RequestScheduling",
            CrawlEvent::RequestSending { .. } => "RequestSending",
            CrawlEvent::ResponseReceived { .. } => "ResponseReceived",
            CrawlEvent::RequestDropped { .. } => "RequestDropped",
            CrawlEvent::ItemScraped { .. } => "ItemScraped",
            CrawlEvent::ItemDropped { .. } => "ItemDropped",
            CrawlEvent::ProcessingError { .. } => "ProcessingError",
            CrawlEvent::RunFinished { .. } => "RunFinished",
        }
    }
}

/// Trait for receiving crawl events (decoupled logging and metrics).
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        let _ = event;
    }
}

/// Listener that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl EventListener for TracingListener {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        match event {
            CrawlEvent::RunStarting { run } => {
                tracing::info!(run_id = %run.id, seeds = run.seed_count, "Run starting");
            }
            CrawlEvent::RequestScheduling { request } => {
                tracing::debug!(url = %request.url(), "Scheduling request");
            }
            CrawlEvent::RequestSending { request } => {
                tracing::debug!(url = %request.url(), "Sending request");
            }
            CrawlEvent::ResponseReceived { response } => {
                tracing::info!(
                    url = %response.url(),
                    status = response.status().as_u16(),
                    bytes = response.body().len(),
                    "Response received"
                );
            }
            CrawlEvent::RequestDropped { request, reason } => {
                tracing::info!(url = %request.url(), %reason, "Request dropped");
            }
            CrawlEvent::ItemScraped { item } => {
                tracing::debug!(fields = item.len(), "Item scraped");
            }
            CrawlEvent::ItemDropped { item, reason } => {
                tracing::info!(fields = item.len(), %reason, "Item dropped");
            }
            CrawlEvent::ProcessingError { request, error } => {
                tracing::warn!(url = %request.url(), %error, "Parse callback failed");
            }
            CrawlEvent::RunFinished { run } => {
                tracing::info!(run_id = %run.id, "Run finished");
            }
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerList = Vec<(ListenerId, Arc<dyn EventListener>)>;

/// Publish/subscribe channel shared by all components of an engine.
///
/// Cloning yields another handle to the same listener list.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<ListenerList>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write_listeners().push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.write_listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.read_listeners().len()
    }

    /// Deliver `event` to every listener in subscription order.
    pub fn publish(&self, event: CrawlEvent<'_>) {
        // Snapshot first so listeners may (un)subscribe without deadlocking.
        let listeners: Vec<_> = self
            .read_listeners()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener.on_event(&event);
        }
    }

    fn read_listeners(&self) -> std::sync::RwLockReadGuard<'_, ListenerList> {
        self.listeners.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned event bus");
            poisoned.into_inner()
        })
    }

    fn write_listeners(&self) -> std::sync::RwLockWriteGuard<'_, ListenerList> {
        self.listeners.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned event bus");
            poisoned.into_inner()
        })
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
