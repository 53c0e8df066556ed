//! Operation context: cancellation and deadlines
//!
//! Every engine and storage entry point takes an [`OpContext`]. Work is
//! aborted at cooperative checkpoints (before taking a lock, between scan
//! iterations, around database round trips) once the context is cancelled or
//! its deadline has passed.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{StorageError, StorageResult};

#[derive(Clone, Debug)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for OpContext {
    fn default() -> Self {
        Self::background()
    }
}

impl OpContext {
    /// A context that is never done unless cancelled explicitly.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context that is cancelled together with `self` and may carry a
    /// tighter deadline. The parent deadline is never extended.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.deadline, timeout) {
            (Some(parent), Some(t)) => Some(parent.min(Instant::now() + t)),
            (None, Some(t)) => Some(Instant::now() + t),
            (parent, None) => parent,
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline_passed()
    }

    /// Checkpoint: `Err(Cancelled)` once the context is done.
    pub fn check(&self) -> StorageResult<()> {
        if self.token.is_cancelled() {
            return Err(StorageError::cancelled("operation cancelled"));
        }
        if self.deadline_passed() {
            return Err(StorageError::cancelled("deadline exceeded"));
        }
        Ok(())
    }

    /// The error reported once [`done`](Self::done) has resolved.
    pub fn cancellation_error(&self) -> StorageError {
        self.check()
            .err()
            .unwrap_or_else(|| StorageError::cancelled("operation cancelled"))
    }

    /// Resolves once the context is cancelled or the deadline is reached.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Race `fut` against the context. The future is dropped (and never
    /// polled again) when the context finishes first.
    pub async fn run<T, F>(&self, fut: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.done() => Err(self.cancellation_error()),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageErrorKind;

    #[test]
    fn test_background_is_not_done() {
        let ctx = OpContext::background();
        assert!(!ctx.is_done());
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().is_none());
    }

    #[test]
    fn test_cancel_marks_done() {
        let ctx = OpContext::background();
        ctx.cancel();
        assert!(ctx.is_done());
        assert_eq!(
            ctx.check().unwrap_err().kind(),
            StorageErrorKind::Cancelled
        );
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = OpContext::with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(ctx.is_done());
        let err = ctx.check().unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::Cancelled);
        assert!(err.message().contains("deadline"));
    }

    #[test]
    fn test_child_follows_parent_cancellation() {
        let parent = OpContext::background();
        let child = parent.child(None);
        parent.cancel();
        assert!(child.is_done());
    }

    #[test]
    fn test_child_never_extends_deadline() {
        let parent = OpContext::with_timeout(Duration::from_millis(50));
        let child = parent.child(Some(Duration::from_secs(60)));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out() {
        let ctx = OpContext::with_timeout(Duration::from_millis(10));
        let result: StorageResult<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(result.unwrap_err().kind(), StorageErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = OpContext::with_timeout(Duration::from_secs(5));
        let result = ctx.run(async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
