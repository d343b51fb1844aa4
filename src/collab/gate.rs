//! Call-spacing gate for the external model endpoint.
//!
//! The gate is the only mutable state shared between runs. It is an
//! explicit value: construct one, clone it into every collaborator that
//! talks to the same endpoint, and all of them are spaced together.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::{Error, Result};

/// Enforces a minimum interval between successive calls.
///
/// `acquire` reserves the next free slot under a short lock and sleeps
/// outside it, so concurrent callers queue up in reservation order.
#[derive(Debug, Clone)]
pub struct RateGate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    min_interval: Duration,
    /// Slot handed to the most recent caller.
    last_slot: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            inner: Arc::new(GateInner {
                min_interval,
                last_slot: Mutex::new(None),
            }),
        }
    }

    /// At most `requests_per_minute` calls per minute (`60 / rpm` seconds apart).
    pub fn per_minute(requests_per_minute: u32) -> Result<Self> {
        if requests_per_minute == 0 {
            return Err(Error::Validation("requests per minute must be positive".into()));
        }
        Ok(Self::new(Duration::from_secs(60) / requests_per_minute))
    }

    /// A gate that never waits.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    /// Wait until this caller may proceed.
    pub async fn acquire(&self) {
        let slot = self.reserve();
        let now = Instant::now();
        if slot > now {
            debug!(wait_ms = (slot - now).as_millis() as u64, "rate gate waiting");
            sleep_until(slot).await;
        }
    }

    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut last = self.inner.last_slot.lock();
        let slot = match *last {
            Some(prev) => (prev + self.inner.min_interval).max(now),
            None => now,
        };
        *last = Some(slot);
        slot
    }
}

impl Default for RateGate {
    fn default() -> Self {
        Self::unlimited()
    }
}
