//! Cancellation for one request: user abort plus a per-attempt deadline.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The user aborted; the whole strategy chain stops.
    User,
    /// The current attempt ran out of time; the next strategy may run.
    Deadline,
}

/// Cancellation handle threaded through one `respond` call.
///
/// Clones share the user-cancel state. [`RequestToken::arm`] derives a copy
/// whose deadline starts now, once per strategy attempt.
#[derive(Debug, Clone, Default)]
pub struct RequestToken {
    cancel: CancellationToken,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl RequestToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Requests user cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns a copy whose deadline is `now + timeout`.
    #[must_use]
    pub fn arm(&self) -> Self {
        Self {
            cancel: self.cancel.clone(),
            timeout: self.timeout,
            deadline: self.timeout.map(|t| Instant::now() + t),
        }
    }

    /// Resolves when the user cancels or the armed deadline passes.
    /// User cancellation wins when both are ready.
    pub async fn cancelled(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => CancelReason::User,
                    () = tokio::time::sleep_until(deadline) => CancelReason::Deadline,
                }
            }
            None => {
                self.cancel.cancelled().await;
                CancelReason::User
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_cancel() {
        let token = RequestToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.cancelled().await, CancelReason::User);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_after_arm() {
        let token = RequestToken::new().with_timeout(Some(Duration::from_secs(5)));
        let armed = token.arm();
        assert_eq!(armed.cancelled().await, CancelReason::Deadline);
        assert!(!token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unarmed_token_ignores_timeout() {
        let token = RequestToken::new().with_timeout(Some(Duration::from_secs(1)));
        let waited = tokio::time::timeout(Duration::from_secs(10), token.cancelled()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_cancel_wins_over_deadline() {
        let token = RequestToken::new().with_timeout(Some(Duration::from_millis(1)));
        let armed = token.arm();
        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();
        assert_eq!(armed.cancelled().await, CancelReason::User);
    }
}
