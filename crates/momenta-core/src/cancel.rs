use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Cooperative cancellation flag shared across one sync run.
///
/// Checked between resolver attempts and raced against the throttle gate's
/// window wait, so a tripped token interrupts a sleeping waiter instead of
/// being noticed after the wait. Cancellation surfaces as a `Cancelled`
/// outcome, never as `NoDataFound`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once the token has been tripped. Pending forever on a token
    /// that is never cancelled.
    pub async fn cancelled(&self) {
        let mut notified = pin!(self.notify.notified());
        // Register before checking the flag so a concurrent `cancel` cannot
        // slip between the check and the wait.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_once_and_stays_tripped() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
        assert!(shared.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_once_tripped() {
        let token = CancelToken::new();
        let waiter = tokio::spawn({
            let token = token.clone();
            async move { token.cancelled().await }
        });

        token.cancel();
        waiter.await.expect("waiter completes");
    }

    #[tokio::test]
    async fn cancelled_is_immediate_on_an_already_tripped_token() {
        let token = CancelToken::new();
        token.cancel();
        token.cancelled().await;
    }
}
