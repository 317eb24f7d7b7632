//! Per-call options attached by the caller to a single outgoing call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// An opaque, extensible per-call configuration value.
///
/// Middleware inspects options through the provided capability accessors
/// rather than by concrete type, so any crate can add its own options.
pub trait CallOption: fmt::Debug + Send + Sync + 'static {
    /// Timeout this option forces on the call, replacing the client default.
    fn forced_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Overrides the client's default timeout for one call.
///
/// A zero duration disables the bound for that call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForcedTimeout {
    timeout: Duration,
}

impl ForcedTimeout {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl CallOption for ForcedTimeout {
    fn forced_timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }
}

/// Builds the option that forces `timeout` on a single call.
#[must_use]
pub const fn with_forced_timeout(timeout: Duration) -> ForcedTimeout {
    ForcedTimeout::new(timeout)
}

/// Ordered list of options attached to one call.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    options: Vec<Arc<dyn CallOption>>,
}

impl CallOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `option`, builder style.
    #[must_use]
    pub fn with(mut self, option: impl CallOption) -> Self {
        self.push(option);
        self
    }

    pub fn push(&mut self, option: impl CallOption) {
        self.options.push(Arc::new(option));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn CallOption> {
        self.options.iter().map(|option| option.as_ref())
    }

    /// The forced timeout of the first option that carries one.
    ///
    /// Later markers are ignored, so duplicates resolve the same way on
    /// every call.
    #[must_use]
    pub fn forced_timeout(&self) -> Option<Duration> {
        self.options.iter().find_map(|option| option.forced_timeout())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
