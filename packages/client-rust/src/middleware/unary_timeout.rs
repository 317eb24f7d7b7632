//! Default-timeout middleware for unary calls.
//!
//! Bounds each call's context by the effective timeout (forced timeout from
//! the call options, else the layer default) before handing it to the next
//! stage. The bounded context is released when the call's future finishes
//! or is dropped.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::{Layer, Service};

use super::resolve::effective_timeout;
use crate::call::UnaryCall;

// ---------------------------------------------------------------------------
// UnaryTimeoutLayer
// ---------------------------------------------------------------------------

/// Tower layer that applies a default timeout to every unary call.
///
/// A zero default leaves calls unbounded unless they carry a forced timeout.
#[derive(Debug, Clone, Copy)]
pub struct UnaryTimeoutLayer {
    default_timeout: Duration,
}

impl UnaryTimeoutLayer {
    #[must_use]
    pub const fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}

impl<S> Layer<S> for UnaryTimeoutLayer {
    type Service = UnaryTimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UnaryTimeoutService {
            inner,
            default_timeout: self.default_timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// UnaryTimeoutService
// ---------------------------------------------------------------------------

/// Service wrapper that bounds each unary call's context.
#[derive(Debug, Clone)]
pub struct UnaryTimeoutService<S> {
    inner: S,
    default_timeout: Duration,
}

impl<S, Req> Service<UnaryCall<Req>> for UnaryTimeoutService<S>
where
    S: Service<UnaryCall<Req>> + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut call: UnaryCall<Req>) -> Self::Future {
        let Some(timeout) = effective_timeout(self.default_timeout, &call.options) else {
            tracing::trace!(method = %call.method, "unary call unbounded");
            return Box::pin(self.inner.call(call));
        };

        let (ctx, guard) = call.ctx.with_timeout(timeout);
        call.ctx = ctx;

        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = timeout.as_millis() as u64;
        tracing::debug!(method = %call.method, timeout_ms, "bounding unary call");

        let fut = self.inner.call(call);
        Box::pin(async move {
            // Held until the inner future resolves or this future is dropped.
            let _guard = guard;
            fut.await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
