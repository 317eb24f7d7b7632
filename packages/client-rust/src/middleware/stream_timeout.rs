//! Default-timeout middleware for streaming calls.
//!
//! A stream outlives the call that opens it, so the bounded context cannot be
//! released when the opener returns. The release guard moves into the
//! returned [`BoundedStream`] and fires when the stream is closed, reaches
//! its end, or is dropped. An opener failure releases it immediately.

use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use calltimeout_core::{CallContext, CancelGuard};
use futures_util::{ready, Sink, Stream};
use tokio::time::Instant;
use tower::{Layer, Service};

use super::resolve::effective_timeout;
use crate::call::StreamCall;

// ---------------------------------------------------------------------------
// StreamTimeoutLayer
// ---------------------------------------------------------------------------

/// Tower layer that applies a default timeout to every opened stream.
///
/// The bound covers the whole stream lifetime, not only the open.
#[derive(Debug, Clone, Copy)]
pub struct StreamTimeoutLayer {
    default_timeout: Duration,
}

impl StreamTimeoutLayer {
    #[must_use]
    pub const fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}

impl<S> Layer<S> for StreamTimeoutLayer {
    type Service = StreamTimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        StreamTimeoutService {
            inner,
            default_timeout: self.default_timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// StreamTimeoutService
// ---------------------------------------------------------------------------

/// Service wrapper that bounds each opened stream's context.
#[derive(Debug, Clone)]
pub struct StreamTimeoutService<S> {
    inner: S,
    default_timeout: Duration,
}

impl<S> Service<StreamCall> for StreamTimeoutService<S>
where
    S: Service<StreamCall> + Send,
    S::Future: Send + 'static,
{
    type Response = BoundedStream<S::Response>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<BoundedStream<S::Response>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut call: StreamCall) -> Self::Future {
        let Some(timeout) = effective_timeout(self.default_timeout, &call.options) else {
            tracing::trace!(method = %call.method, "stream unbounded");
            let fut = self.inner.call(call);
            return Box::pin(async move { fut.await.map(BoundedStream::unbounded) });
        };

        let (ctx, guard) = call.ctx.with_timeout(timeout);
        call.ctx = ctx.clone();

        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = timeout.as_millis() as u64;
        tracing::debug!(
            method = %call.method,
            stream = %call.desc.stream_name,
            timeout_ms,
            "bounding stream"
        );

        let fut = self.inner.call(call);
        Box::pin(async move {
            // On opener failure the guard drops here and releases the context.
            let stream = fut.await?;
            Ok(BoundedStream::bounded(stream, ctx, guard))
        })
    }
}

// ---------------------------------------------------------------------------
// BoundedStream
// ---------------------------------------------------------------------------

/// A stream handle that owns the release guard of its bounded context.
///
/// Release happens on [`release`](Self::release), when the inner `Stream` ends,
/// when the inner `Sink` finishes closing, or on drop, whichever comes first.
/// Unbounded streams carry no context and are a plain wrapper.
pub struct BoundedStream<T> {
    inner: T,
    ctx: Option<CallContext>,
    guard: Option<CancelGuard>,
}

impl<T> BoundedStream<T> {
    fn bounded(inner: T, ctx: CallContext, guard: CancelGuard) -> Self {
        Self {
            inner,
            ctx: Some(ctx),
            guard: Some(guard),
        }
    }

    fn unbounded(inner: T) -> Self {
        Self {
            inner,
            ctx: None,
            guard: None,
        }
    }

    /// The bounded context handed to the stream opener, if any.
    pub fn context(&self) -> Option<&CallContext> {
        self.ctx.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.ctx.as_ref().and_then(CallContext::deadline)
    }

    pub fn is_bounded(&self) -> bool {
        self.ctx.is_some()
    }

    /// Returns `true` once the bounded context has been released.
    pub fn is_released(&self) -> bool {
        self.ctx.is_some() && self.guard.is_none()
    }

    /// Releases the bounded context. Idempotent.
    ///
    /// Call this when the stream is finished with but kept around.
    pub fn release(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.cancel();
            tracing::trace!("bounded stream released");
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Splits off the inner stream. The caller becomes responsible for the
    /// guard; dropping it releases the context.
    pub fn into_parts(self) -> (T, Option<CancelGuard>) {
        (self.inner, self.guard)
    }
}

impl<T> fmt::Debug for BoundedStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Inner streams are often boxed trait objects without `Debug`.
        f.debug_struct("BoundedStream")
            .field("deadline", &self.deadline())
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

impl<T> Deref for BoundedStream<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for BoundedStream<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T> Stream for BoundedStream<T>
where
    T: Stream + Unpin,
{
    type Item = T::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = ready!(Pin::new(&mut self.inner).poll_next(cx));
        if item.is_none() {
            self.release();
        }
        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, Item> Sink<Item> for BoundedStream<T>
where
    T: Sink<Item> + Unpin,
{
    type Error = T::Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_ready(cx)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Item) -> Result<(), Self::Error> {
        Pin::new(&mut self.inner).start_send(item)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let result = ready!(Pin::new(&mut self.inner).poll_close(cx));
        self.release();
        Poll::Ready(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
