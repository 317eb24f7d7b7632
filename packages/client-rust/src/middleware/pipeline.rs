//! Interceptor construction and pipeline composition.

use std::time::Duration;

use tower::{Service, ServiceBuilder};

use super::stream_timeout::{BoundedStream, StreamTimeoutLayer};
use super::trace::CallTraceLayer;
use super::unary_timeout::UnaryTimeoutLayer;
use crate::call::{StreamCall, UnaryCall};
use crate::config::TimeoutConfig;

/// Layer applying `default_timeout` to every unary call.
///
/// Register it once when the client connection is set up.
#[must_use]
pub const fn build_unary_interceptor(default_timeout: Duration) -> UnaryTimeoutLayer {
    UnaryTimeoutLayer::new(default_timeout)
}

/// Layer applying `default_timeout` to every opened stream.
#[must_use]
pub const fn build_stream_interceptor(default_timeout: Duration) -> StreamTimeoutLayer {
    StreamTimeoutLayer::new(default_timeout)
}

/// Wraps a unary transport with the timeout and tracing layers.
///
/// Layer order (outermost to innermost):
/// 1. `UnaryTimeoutLayer` -- bound the call's context
/// 2. `CallTraceLayer` -- record timing and outcome against the bounded context
#[must_use]
pub fn build_unary_pipeline<T, Req>(
    transport: T,
    config: &TimeoutConfig,
) -> impl Service<UnaryCall<Req>, Response = T::Response, Error = T::Error>
where
    T: Service<UnaryCall<Req>> + Send,
    T::Future: Send + 'static,
    T::Response: 'static,
    T::Error: 'static,
{
    ServiceBuilder::new()
        .layer(config.unary_layer())
        .layer(CallTraceLayer)
        .service(transport)
}

/// Wraps a stream opener with the timeout and tracing layers.
#[must_use]
pub fn build_stream_pipeline<T>(
    opener: T,
    config: &TimeoutConfig,
) -> impl Service<StreamCall, Response = BoundedStream<T::Response>, Error = T::Error>
where
    T: Service<StreamCall> + Send,
    T::Future: Send + 'static,
    T::Response: 'static,
    T::Error: 'static,
{
    ServiceBuilder::new()
        .layer(config.stream_layer())
        .layer(CallTraceLayer)
        .service(opener)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
