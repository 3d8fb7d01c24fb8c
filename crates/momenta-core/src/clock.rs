//! Injectable time source.
//!
//! The throttle gate and the 429 backoff path never call `Instant::now` or
//! sleep directly; they go through [`Clock`] so tests can drive time with a
//! manual clock instead of real sleeping.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Suspend the calling task for `duration`. Cooperative; must never
    /// busy-spin.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Production clock backed by the tokio timer.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[cfg(test)]
pub(crate) mod manual {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Deterministic clock whose `sleep` advances its own notion of now and
    /// resolves immediately. Every requested sleep is recorded.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        base: Instant,
        elapsed: Arc<Mutex<Duration>>,
        slept: Arc<Mutex<Vec<Duration>>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                base: Instant::now(),
                elapsed: Arc::new(Mutex::new(Duration::ZERO)),
                slept: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn advance(&self, duration: Duration) {
            let mut elapsed = self.elapsed.lock().expect("manual clock poisoned");
            *elapsed += duration;
        }

        pub fn slept(&self) -> Vec<Duration> {
            self.slept.lock().expect("manual clock poisoned").clone()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            let elapsed = *self.elapsed.lock().expect("manual clock poisoned");
            self.base + elapsed
        }

        fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            self.slept
                .lock()
                .expect("manual clock poisoned")
                .push(duration);
            self.advance(duration);
            Box::pin(std::future::ready(()))
        }
    }
}
