//! Effective-timeout resolution shared by the unary and streaming layers.

use std::time::Duration;

use calltimeout_core::CallOptions;

/// Timeout to enforce on one call, or `None` when the call is unbounded.
///
/// The first forced timeout among `options` wins over `default`. A zero
/// result disables the bound.
#[must_use]
pub fn effective_timeout(default: Duration, options: &CallOptions) -> Option<Duration> {
    let timeout = options.forced_timeout().unwrap_or(default);
    (!timeout.is_zero()).then_some(timeout)
}
