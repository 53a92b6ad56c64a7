//! Cancellation and deadline propagation for a pipeline run.
//!
//! Every blocking operation in a run receives a [`RunContext`] and must return
//! promptly once the context is cancelled or its deadline passes. Work that
//! already completed is never rolled back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellable run context with an optional deadline.
///
/// Clones share the same cancellation signal. [`RunContext::with_timeout`]
/// derives a context with a tighter deadline that still follows the parent's
/// cancellation.
#[derive(Debug, Clone)]
pub struct RunContext {
    cancel: Arc<watch::Sender<bool>>,
    deadline: Option<Instant>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::background()
    }
}

impl RunContext {
    /// A context without deadline that is only stopped by [`RunContext::cancel`].
    pub fn background() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            cancel: Arc::new(tx),
            deadline: None,
        }
    }

    /// A fresh context that expires after `timeout`.
    pub fn with_deadline_in(timeout: Duration) -> Self {
        Self::background().with_timeout(timeout)
    }

    /// Derive a context whose deadline is the earlier of the current one and `now + timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing <= candidate => existing,
            _ => candidate,
        };
        Self {
            cancel: Arc::clone(&self.cancel),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns the reason the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if *self.cancel.borrow() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Fails fast if the context is already done.
    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        let mut rx = self.cancel.subscribe();
        let deadline = self.deadline;

        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            // The sender lives in `self`, so the channel cannot close while we wait.
            _ = rx.wait_for(|cancelled| *cancelled) => ContextError::Cancelled,
            _ = expired => ContextError::DeadlineExceeded,
        }
    }

    /// Sleep for `duration` unless the context finishes first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Run `fut` bound to this context.
    ///
    /// The future is dropped as soon as the context is done and the context
    /// error is converted into the caller's error type.
    pub async fn run<F, T, E>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<ContextError>,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(E::from(err)),
            res = fut => res,
        }
    }
}
