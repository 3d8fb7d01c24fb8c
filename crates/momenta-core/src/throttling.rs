//! Process-wide sliding-window rate limiting for upstream calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::error::FetchError;

/// Polygon free tier: 5 requests per rolling 60-second window.
pub const FREE_TIER_LIMIT: usize = 5;
pub const FREE_TIER_WINDOW: Duration = Duration::from_secs(60);

/// Margin added to computed waits so a re-check lands after the oldest
/// grant has actually left the window.
const WAIT_EPSILON: Duration = Duration::from_millis(50);

/// Gate enforcing "at most N call-starts per trailing window" across every
/// task sharing it.
///
/// Construct one per upstream provider per process and clone it into each
/// fetch path; clones share the grant queue.
#[derive(Clone)]
pub struct ThrottleGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    clock: Arc<dyn Clock>,
    limit: usize,
    window: Duration,
    grants: Mutex<VecDeque<Instant>>,
}

impl ThrottleGate {
    pub fn new(limit: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(GateInner {
                clock,
                limit: limit.max(1),
                window,
                grants: Mutex::new(VecDeque::new()),
            }),
        }
    }

    pub fn polygon_free_tier(clock: Arc<dyn Clock>) -> Self {
        Self::new(FREE_TIER_LIMIT, FREE_TIER_WINDOW, clock)
    }

    /// Block (by suspension) until the caller may start one outbound call.
    ///
    /// Expired grants are dropped from the front of the queue; if a slot is
    /// free the grant is recorded and the call returns. Otherwise the task
    /// sleeps until the oldest grant leaves the window and re-checks, in a
    /// loop, since multiple waiters may race for the freed slot. The sleep
    /// is raced against the token, so cancellation interrupts a waiter
    /// mid-window instead of after it. Only cancellation makes this fail.
    pub async fn acquire(&self, cancel: &CancelToken) -> Result<(), FetchError> {
        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let wait = {
                let mut grants = self
                    .inner
                    .grants
                    .lock()
                    .expect("throttle grant queue should not be poisoned");
                let now = self.inner.clock.now();

                while let Some(&oldest) = grants.front() {
                    if now.saturating_duration_since(oldest) >= self.inner.window {
                        grants.pop_front();
                    } else {
                        break;
                    }
                }

                if grants.len() < self.inner.limit {
                    grants.push_back(now);
                    return Ok(());
                }

                let oldest = *grants.front().expect("queue is non-empty at limit");
                self.inner.window - now.saturating_duration_since(oldest) + WAIT_EPSILON
            };

            tokio::select! {
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
                () = self.inner.clock.sleep(wait) => {}
            }
        }
    }

    /// Grants currently inside the trailing window.
    pub fn grants_in_window(&self) -> usize {
        let mut grants = self
            .inner
            .grants
            .lock()
            .expect("throttle grant queue should not be poisoned");
        let now = self.inner.clock.now();
        while let Some(&oldest) = grants.front() {
            if now.saturating_duration_since(oldest) >= self.inner.window {
                grants.pop_front();
            } else {
                break;
            }
        }
        grants.len()
    }
}
