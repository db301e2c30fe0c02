use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Why an operation stopped before finishing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Interrupt {
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cloneable cancellation flag.
///
/// Every clone observes the same state. Cancelling is one-way and
/// idempotent.
///
/// ```rust
/// use dagpath_types::CancellationToken;
///
/// let token = CancellationToken::new();
/// let seen_by_worker = token.clone();
/// assert!(!seen_by_worker.is_cancelled());
/// token.cancel();
/// assert!(seen_by_worker.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::SeqCst) {
            self.state.notify.notify_waiters();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel between
            // the check and the await cannot be missed.
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// The cancellation and deadline scope of one resolution.
///
/// A context is cheap to clone and is passed by reference to every layer
/// that may wait: the resolver loop, the block source, and the reifier.
///
/// ```text
/// ┌───────────────────────┬──────────────────────────────────────────┐
/// │ Condition             │ Reported as                              │
/// ├───────────────────────┼──────────────────────────────────────────┤
/// │ token cancelled       │ Interrupt::Cancelled                     │
/// │ now >= deadline       │ Interrupt::DeadlineExceeded              │
/// │ both                  │ Interrupt::Cancelled                     │
/// └───────────────────────┴──────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, Default)]
pub struct ResolveContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ResolveContext {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Set a deadline. An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Report whether the context has already been interrupted.
    ///
    /// # Errors
    ///
    /// The [`Interrupt`] that applies, cancellation first.
    pub fn check(&self) -> Result<(), Interrupt> {
        if self.token.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupt::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Completes when the context is interrupted, yielding the reason.
    ///
    /// Never completes for a background context.
    pub async fn interrupted(&self) -> Interrupt {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.token.cancelled() => Interrupt::Cancelled,
                () = tokio::time::sleep_until(deadline) => Interrupt::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Interrupt::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_never_interrupted() {
        assert_eq!(ResolveContext::background().check(), Ok(()));
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let ctx = ResolveContext::background().with_cancellation(token.clone());
        token.cancel();
        token.cancel();
        assert_eq!(ctx.check(), Err(Interrupt::Cancelled));
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = ResolveContext::background()
            .with_deadline(now + Duration::from_secs(10))
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(5));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn cancellation_takes_precedence_over_deadline() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ResolveContext::background()
            .with_cancellation(token)
            .with_deadline(Instant::now());
        assert_eq!(ctx.check(), Err(Interrupt::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires() {
        let ctx = ResolveContext::background().with_timeout(Duration::from_millis(50));
        assert_eq!(ctx.check(), Ok(()));
        assert_eq!(ctx.interrupted().await, Interrupt::DeadlineExceeded);
        assert_eq!(ctx.check(), Err(Interrupt::DeadlineExceeded));
    }

    #[tokio::test]
    async fn cancel_wakes_waiter() {
        let token = CancellationToken::new();
        let ctx = ResolveContext::background().with_cancellation(token.clone());
        let waiter = tokio::spawn(async move { ctx.interrupted().await });
        tokio::task::yield_now().await;
        token.cancel();
        assert_eq!(waiter.await.unwrap(), Interrupt::Cancelled);
    }
}
