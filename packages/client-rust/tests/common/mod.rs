//! In-process transport used by the end-to-end tests.
//!
//! A handler task plays the server: it receives requests over a channel,
//! sleeps for the configured latency, then answers. The client half gives up
//! as soon as the call context ends, the way a real transport would.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use calltimeout_client::{ContextError, StreamCall, UnaryCall};
use futures_util::Stream;
use tokio::sync::{mpsc, oneshot};
use tower::Service;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("canceled")]
    Canceled,
    #[error("server unavailable")]
    Unavailable,
}

impl From<ContextError> for TransportError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::DeadlineExceeded => Self::DeadlineExceeded,
            ContextError::Canceled => Self::Canceled,
        }
    }
}

type Envelope = (String, oneshot::Sender<String>);

/// Client half of a loopback unary transport.
#[derive(Clone)]
pub struct LoopbackTransport {
    requests: mpsc::Sender<Envelope>,
}

/// Spawns a handler that answers each request after `latency`.
pub fn spawn_unary_server(latency: Duration) -> LoopbackTransport {
    let (tx, mut rx) = mpsc::channel::<Envelope>(16);
    tokio::spawn(async move {
        while let Some((request, reply)) = rx.recv().await {
            tokio::spawn(async move {
                tokio::time::sleep(latency).await;
                let _ = reply.send(format!("echo:{request}"));
            });
        }
    });
    LoopbackTransport { requests: tx }
}

impl Service<UnaryCall<String>> for LoopbackTransport {
    type Response = String;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<String, TransportError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: UnaryCall<String>) -> Self::Future {
        let requests = self.requests.clone();
        Box::pin(async move {
            let (reply_tx, reply_rx) = oneshot::channel();
            requests
                .send((call.request, reply_tx))
                .await
                .map_err(|_| TransportError::Unavailable)?;
            tokio::select! {
                reply = reply_rx => reply.map_err(|_| TransportError::Unavailable),
                err = call.ctx.done() => Err(err.into()),
            }
        })
    }
}

pub type TickStream = Pin<Box<dyn Stream<Item = Result<u64, TransportError>> + Send>>;

/// Stream opener whose server emits a tick every `interval`.
#[derive(Clone)]
pub struct TickServer {
    pub interval: Duration,
}

impl Service<StreamCall> for TickServer {
    type Response = TickStream;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<TickStream, TransportError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: StreamCall) -> Self::Future {
        let interval = self.interval;
        Box::pin(async move {
            let (tx, rx) = mpsc::channel::<u64>(4);
            tokio::spawn(async move {
                let mut n = 0;
                loop {
                    tokio::time::sleep(interval).await;
                    if tx.send(n).await.is_err() {
                        break;
                    }
                    n += 1;
                }
            });

            let ticks = futures_util::stream::unfold(
                (rx, call.ctx, false),
                |(mut rx, ctx, finished)| async move {
                    if finished {
                        return None;
                    }
                    let next = tokio::select! {
                        tick = rx.recv() => tick.ok_or(TransportError::Unavailable),
                        err = ctx.done() => Err(err.into()),
                    };
                    let finished = next.is_err();
                    Some((next, (rx, ctx, finished)))
                },
            );
            Ok(Box::pin(ticks) as TickStream)
        })
    }
}
