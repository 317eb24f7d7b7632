/// Reason a [`CallContext`](crate::CallContext) is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The context, or one of its ancestors, was cancelled explicitly.
    #[error("context canceled")]
    Canceled,
    /// The context's deadline passed before the work completed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl ContextError {
    /// Returns `true` for [`ContextError::DeadlineExceeded`].
    #[must_use]
    pub const fn is_deadline_exceeded(self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}
