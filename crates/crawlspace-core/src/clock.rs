//! Time source used by the scheduler.
//!
//! Abstracted so throttling can be exercised in tests without real waiting:
//! [`FakeClock`] moves a virtual offset forward instead of sleeping.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Supplies the current time and a way to wait.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Wait until `deadline`. Returns immediately if it has already passed.
    fn sleep_until(&self, deadline: Instant) -> impl Future<Output = ()> + Send {
        async move {
            let now = self.now();
            if deadline > now {
                self.sleep(deadline - now).await;
            }
        }
    }
}

/// Wall clock backed by `tokio::time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock for tests. Sleeping advances time instantly.
#[derive(Debug, Clone)]
pub struct FakeClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward without anyone sleeping.
    pub fn advance(&self, duration: Duration) {
        *self.lock_offset() += duration;
    }

    /// Total virtual time that has passed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        *self.lock_offset()
    }

    fn lock_offset(&self) -> std::sync::MutexGuard<'_, Duration> {
        self.offset.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned fake clock");
            poisoned.into_inner()
        })
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
