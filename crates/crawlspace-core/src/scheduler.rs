//! Pending-request queue with optional per-domain politeness delay.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use crawlspace_core::clock::SystemClock;
//! use crawlspace_core::scheduler::{ArrayRequestScheduler, SchedulerConfig};
//!
//! // At most one request per domain every 500ms, plus up to 250ms of jitter.
//! let config = SchedulerConfig::new(Duration::from_millis(500))
//!     .with_jitter(Duration::from_millis(250));
//! let scheduler = ArrayRequestScheduler::with_config(SystemClock, config);
//! ```

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::error::CrawlError;
use crate::request::Request;

/// Holds pending requests and decides which one runs next.
pub trait RequestScheduler: Send {
    fn schedule(&mut self, request: Request);

    fn is_empty(&self) -> bool;

    fn len(&self) -> usize;

    /// Take the next request to run.
    ///
    /// Fails with [`CrawlError::EmptyScheduler`] when nothing is pending, so
    /// callers must check [`is_empty`](Self::is_empty) first.
    fn next_request(&mut self) -> impl Future<Output = Result<Request, CrawlError>> + Send;

    /// Forget pending requests and any per-domain state.
    fn clear(&mut self);
}

/// Configuration for the per-domain delay.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Minimum delay between consecutive requests to the same domain.
    /// `Duration::ZERO` disables throttling.
    pub domain_delay: Duration,

    /// Maximum random jitter added on top of `domain_delay` (uniform [0, jitter]).
    pub jitter: Duration,
}

impl SchedulerConfig {
    pub fn new(domain_delay: Duration) -> Self {
        Self {
            domain_delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn is_throttled(&self) -> bool {
        !self.domain_delay.is_zero()
    }

    /// Delay for a single visit (delay + random jitter).
    fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.domain_delay;
        }
        let jitter_ms = rand_jitter_ms(self.jitter.as_millis() as u64);
        self.domain_delay + Duration::from_millis(jitter_ms)
    }
}

#[derive(Debug)]
struct Queued {
    request: Request,
    origin: String,
}

/// In-memory scheduler: highest priority first, FIFO among equal priorities.
///
/// With a non-zero [`SchedulerConfig::domain_delay`] it skips over requests
/// whose domain was visited too recently. If every pending domain is cooling
/// down it waits on the clock for the earliest one instead of failing.
#[derive(Debug)]
pub struct ArrayRequestScheduler<C> {
    queue: VecDeque<Queued>,
    clock: C,
    config: SchedulerConfig,
    /// Earliest instant each domain may be visited again.
    next_allowed: HashMap<String, Instant>,
}

impl<C: Clock> ArrayRequestScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self::with_config(clock, SchedulerConfig::default())
    }

    pub fn with_config(clock: C, config: SchedulerConfig) -> Self {
        Self {
            queue: VecDeque::new(),
            clock,
            config,
            next_allowed: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn ready_at(&self, origin: &str) -> Option<Instant> {
        self.next_allowed.get(origin).copied()
    }

    fn take(&mut self, index: usize) -> Result<Request, CrawlError> {
        let queued = self.queue.remove(index).ok_or(CrawlError::EmptyScheduler)?;
        if self.config.is_throttled() {
            let next = self.clock.now() + self.config.effective_delay();
            self.next_allowed.insert(queued.origin, next);
        }
        Ok(queued.request)
    }
}

impl<C: Clock> RequestScheduler for ArrayRequestScheduler<C> {
    fn schedule(&mut self, request: Request) {
        let origin = request.origin();
        let priority = request.priority();
        let queued = Queued { request, origin };
        match self
            .queue
            .iter()
            .position(|q| q.request.priority() < priority)
        {
            Some(index) => self.queue.insert(index, queued),
            None => self.queue.push_back(queued),
        }
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    async fn next_request(&mut self) -> Result<Request, CrawlError> {
        if self.queue.is_empty() {
            return Err(CrawlError::EmptyScheduler);
        }
        if !self.config.is_throttled() {
            return self.take(0);
        }

        let now = self.clock.now();
        let ready = self.queue.iter().position(|q| {
            self.ready_at(&q.origin)
                .is_none_or(|ready_at| ready_at <= now)
        });
        if let Some(index) = ready {
            return self.take(index);
        }

        // Every pending domain is cooling down: wait for the earliest one.
        let (index, ready_at) = self
            .queue
            .iter()
            .enumerate()
            .filter_map(|(i, q)| self.ready_at(&q.origin).map(|at| (i, at)))
            .min_by_key(|(_, at)| *at)
            .ok_or(CrawlError::EmptyScheduler)?;
        tracing::debug!(
            origin = %self.queue[index].origin,
            sleep_ms = %ready_at.saturating_duration_since(now).as_millis(),
            "Throttling request"
        );
        self.clock.sleep_until(ready_at).await;
        self.take(index)
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.next_allowed.clear();
    }
}

// ---------------------------------------------------------------------------
// Jitter based on std, seeded from the current time. Not crypto.
// ---------------------------------------------------------------------------

fn rand_jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    // xorshift64
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}
