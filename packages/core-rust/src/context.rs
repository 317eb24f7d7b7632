//! Call contexts: cancellation, deadlines and inherited values for one outgoing call.
//!
//! A [`CallContext`] is derived from a parent and observes the parent's
//! cancellation. Derivations that add their own cancellation return a
//! [`CancelGuard`]; dropping the guard releases the child's cancellation
//! signal without touching the parent.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ContextError;

/// Cancellation scope and optional deadline carried by every call.
///
/// Cloning is cheap and clones observe the same cancellation state.
#[derive(Debug, Clone)]
pub struct CallContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    token: CancellationToken,
    deadline: Option<Instant>,
    cause: OnceLock<ContextError>,
    parent: Option<CallContext>,
    value: Option<(String, String)>,
}

impl CallContext {
    /// Root context: never cancelled, no deadline, no values.
    #[must_use]
    pub fn background() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                token: CancellationToken::new(),
                deadline: None,
                cause: OnceLock::new(),
                parent: None,
                value: None,
            }),
        }
    }

    /// Derives a child that can be cancelled on its own.
    ///
    /// The child inherits this context's deadline and values.
    pub fn with_cancel(&self) -> (CallContext, CancelGuard) {
        self.derive(self.inner.deadline)
    }

    /// Derives a child whose deadline is `timeout` from now, or this
    /// context's deadline if that comes first.
    pub fn with_timeout(&self, timeout: Duration) -> (CallContext, CancelGuard) {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    /// Derives a child that expires at `deadline`, or at this context's
    /// deadline if that comes first.
    pub fn with_deadline(&self, deadline: Instant) -> (CallContext, CancelGuard) {
        let deadline = match self.inner.deadline {
            Some(parent) if parent <= deadline => parent,
            _ => deadline,
        };
        self.derive(Some(deadline))
    }

    /// Derives a child carrying one extra key/value binding.
    ///
    /// The child shares this context's cancellation and deadline.
    #[must_use]
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> CallContext {
        CallContext {
            inner: Arc::new(ContextInner {
                token: self.inner.token.clone(),
                deadline: self.inner.deadline,
                cause: OnceLock::new(),
                parent: Some(self.clone()),
                value: Some((key.into(), value.into())),
            }),
        }
    }

    /// Looks up the nearest binding for `key`, walking towards the root.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some((k, v)) = &ctx.inner.value {
                if k == key {
                    return Some(v.as_str());
                }
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    /// Point in time at which this context expires, if bounded.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline. `Some(ZERO)` once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns `true` once the context is cancelled or expired.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Why the context is done, or `None` while it is still live.
    ///
    /// The first observed cause is recorded and never changes afterwards.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if let Some(cause) = self.inner.cause.get() {
            return Some(*cause);
        }
        let observed = if self.inner.token.is_cancelled() {
            self.inner
                .parent
                .as_ref()
                .and_then(CallContext::err)
                .unwrap_or(ContextError::Canceled)
        } else if self.deadline_passed() {
            ContextError::DeadlineExceeded
        } else {
            return None;
        };
        Some(*self.inner.cause.get_or_init(|| observed))
    }

    /// Resolves when the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.inner.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.inner.token.cancelled().await,
        }
        self.err().unwrap_or(ContextError::DeadlineExceeded)
    }

    fn derive(&self, deadline: Option<Instant>) -> (CallContext, CancelGuard) {
        let child = CallContext {
            inner: Arc::new(ContextInner {
                token: self.inner.token.child_token(),
                deadline,
                cause: OnceLock::new(),
                parent: Some(self.clone()),
                value: None,
            }),
        };
        let guard = CancelGuard {
            ctx: Some(child.clone()),
        };
        (child, guard)
    }

    fn deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn release(&self) {
        if self.inner.token.is_cancelled() {
            return;
        }
        let cause = if self.deadline_passed() {
            ContextError::DeadlineExceeded
        } else {
            ContextError::Canceled
        };
        // First cause wins; a racing release already recorded one.
        let _ = self.inner.cause.set(cause);
        self.inner.token.cancel();
        tracing::trace!(cause = %cause, "call context released");
    }
}

/// Releases a derived context's cancellation signal when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard cancels the derived context immediately"]
pub struct CancelGuard {
    ctx: Option<CallContext>,
}

impl CancelGuard {
    /// Cancels the derived context now.
    pub fn cancel(mut self) {
        if let Some(ctx) = self.ctx.take() {
            ctx.release();
        }
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            ctx.release();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
