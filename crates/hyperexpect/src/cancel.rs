//! Cancellation tokens for in-flight requests.
//!
//! A [`CancelToken`] can be attached to a whole session through
//! [`Config::cancel`](crate::Config::cancel) or to a single request with
//! [`Request::with_cancel`](crate::Request::with_cancel). Cancelling aborts
//! the current attempt and any pending retry backoff.
//!
//! # Example
//!
//! ```rust,ignore
//! use hyperexpect::CancelToken;
//!
//! let token = CancelToken::new();
//! let cancel = token.clone();
//!
//! tokio::spawn(async move {
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     cancel.cancel();
//! });
//!
//! e.get("/long-poll").with_cancel(token).expect().await;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

/// A cloneable token that signals cancellation to every holder.
#[derive(Debug, Clone)]
pub struct CancelToken {
    /// Whether cancellation has been triggered
    cancelled: Arc<AtomicBool>,

    /// Broadcast sender for notifying waiters
    sender: broadcast::Sender<()>,
}

impl CancelToken {
    /// Creates a new, untriggered token.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hyperexpect::CancelToken;
    ///
    /// let token = CancelToken::new();
    /// assert!(!token.is_cancelled());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Triggers cancellation.
    ///
    /// Calling this multiple times is safe and idempotent.
    pub fn cancel(&self) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // No receivers is fine.
            let _ = self.sender.send(());
        }
    }

    /// Returns `true` if cancellation has been triggered.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Completes when the token is cancelled.
    ///
    /// Completes immediately if the token was already cancelled.
    pub async fn cancelled(&self) {
        // Subscribe before checking the flag so a concurrent cancel is never missed.
        let mut receiver = self.sender.subscribe();
        if self.is_cancelled() {
            return;
        }
        let _ = receiver.recv().await;
    }

    /// Cancels the token once `delay` has elapsed, acting as a deadline.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn cancel_after(&self, delay: Duration) {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            token.cancel();
        });
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_new() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_completes_when_triggered() {
        let token = CancelToken::new();
        let trigger = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("cancelled should complete");
    }

    #[tokio::test]
    async fn test_cancelled_completes_immediately_if_triggered() {
        let token = CancelToken::new();
        token.cancel();

        tokio::time::timeout(Duration::from_millis(10), token.cancelled())
            .await
            .expect("should complete immediately");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_acts_as_deadline() {
        let token = CancelToken::new();
        token.cancel_after(Duration::from_secs(5));
        assert!(!token.is_cancelled());

        token.cancelled().await;
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancelled_pending_until_cancel() {
        let token = CancelToken::new();
        let mut waiter = tokio_test::task::spawn(token.cancelled());
        tokio_test::assert_pending!(waiter.poll());

        token.cancel();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }
}
