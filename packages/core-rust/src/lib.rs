//! Call timeouts core: call contexts, cancellation, and per-call options.

pub mod context;
pub mod error;
pub mod options;

pub use context::{CallContext, CancelGuard};
pub use error::ContextError;
pub use options::{with_forced_timeout, CallOption, CallOptions, ForcedTimeout};
