//! Tower middleware layers for the client call pipeline.
//!
//! - [`unary_timeout`]: Default and forced timeouts for unary calls
//! - [`stream_timeout`]: Default and forced timeouts for streams, released on stream close
//! - [`trace`]: Call timing and outcome via `tracing` spans
//! - [`pipeline`]: Interceptor constructors and composed pipelines

pub mod pipeline;
pub mod resolve;
pub mod stream_timeout;
pub mod trace;
pub mod unary_timeout;

pub use pipeline::{
    build_stream_interceptor, build_stream_pipeline, build_unary_interceptor, build_unary_pipeline,
};
pub use resolve::effective_timeout;
pub use stream_timeout::{BoundedStream, StreamTimeoutLayer, StreamTimeoutService};
pub use trace::CallTraceLayer;
pub use unary_timeout::{UnaryTimeoutLayer, UnaryTimeoutService};
