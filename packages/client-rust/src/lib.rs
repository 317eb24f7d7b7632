//! Call timeouts client: tower interceptors that bound unary and streaming RPC calls.

pub mod call;
pub mod config;
pub mod logging;
pub mod middleware;

pub use call::{RpcCall, StreamCall, StreamDescriptor, UnaryCall};
pub use calltimeout_core::{
    with_forced_timeout, CallContext, CallOption, CallOptions, CancelGuard, ContextError,
    ForcedTimeout,
};
pub use config::{ConfigError, TimeoutConfig};
pub use logging::{init_logging, LogFormat};
pub use middleware::{
    build_stream_interceptor, build_stream_pipeline, build_unary_interceptor, build_unary_pipeline,
    BoundedStream, CallTraceLayer, StreamTimeoutLayer, UnaryTimeoutLayer,
};
