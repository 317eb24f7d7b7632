//! End-to-end timeout behaviour against an in-process server.

mod common;

use std::time::Duration;

use calltimeout_client::{
    build_stream_pipeline, build_unary_pipeline, with_forced_timeout, StreamCall,
    StreamDescriptor, TimeoutConfig, UnaryCall,
};
use common::{spawn_unary_server, TickServer, TransportError};
use futures_util::StreamExt;
use tokio::time::Instant;
use tower::{Service, ServiceExt};

fn config(unary_ms: i64, stream_ms: i64) -> TimeoutConfig {
    TimeoutConfig {
        unary_timeout_ms: unary_ms,
        stream_timeout_ms: stream_ms,
    }
}

#[tokio::test(start_paused = true)]
async fn default_timeout_cuts_off_slow_handler() {
    let transport = spawn_unary_server(Duration::from_millis(200));
    let client = build_unary_pipeline(transport, &config(50, 0));
    let start = Instant::now();

    let err = client
        .oneshot(UnaryCall::new("/echo.Echo/Say", "hello".to_string()))
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::DeadlineExceeded);
    assert_eq!(start.elapsed(), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn forced_timeout_lets_slow_handler_finish() {
    let transport = spawn_unary_server(Duration::from_millis(200));
    let client = build_unary_pipeline(transport, &config(50, 0));
    let start = Instant::now();

    let reply = client
        .oneshot(
            UnaryCall::new("/echo.Echo/Say", "hello".to_string())
                .with_option(with_forced_timeout(Duration::from_millis(500))),
        )
        .await
        .unwrap();

    assert_eq!(reply, "echo:hello");
    assert_eq!(start.elapsed(), Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn zero_default_applies_no_bound() {
    let transport = spawn_unary_server(Duration::from_secs(1));
    let client = build_unary_pipeline(transport, &config(0, 0));
    let start = Instant::now();

    let reply = client
        .oneshot(UnaryCall::new("/echo.Echo/Say", "late".to_string()))
        .await
        .unwrap();

    assert_eq!(reply, "echo:late");
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn negative_default_applies_no_bound() {
    let transport = spawn_unary_server(Duration::from_secs(1));
    let client = build_unary_pipeline(transport, &config(-50, 0));

    let reply = client
        .oneshot(UnaryCall::new("/echo.Echo/Say", "late".to_string()))
        .await
        .unwrap();

    assert_eq!(reply, "echo:late");
}

#[tokio::test(start_paused = true)]
async fn one_client_serves_calls_with_different_timeouts() {
    let transport = spawn_unary_server(Duration::from_millis(100));
    let mut client = build_unary_pipeline(transport, &config(50, 0));

    let short = client
        .ready()
        .await
        .unwrap()
        .call(UnaryCall::new("/echo.Echo/Say", "a".to_string()));
    let long = client.ready().await.unwrap().call(
        UnaryCall::new("/echo.Echo/Say", "b".to_string())
            .with_option(with_forced_timeout(Duration::from_millis(150))),
    );

    let (short, long) = tokio::join!(short, long);
    assert_eq!(short.unwrap_err(), TransportError::DeadlineExceeded);
    assert_eq!(long.unwrap(), "echo:b");
}

#[tokio::test(start_paused = true)]
async fn stream_stays_usable_until_its_deadline() {
    let client = build_stream_pipeline(
        TickServer {
            interval: Duration::from_millis(20),
        },
        &config(0, 70),
    );
    let start = Instant::now();

    let mut stream = client
        .oneshot(StreamCall::new(
            StreamDescriptor::server_streaming("Ticks"),
            "/clock.Clock/Ticks",
        ))
        .await
        .unwrap();

    let mut received = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(tick) => received.push(tick),
            Err(err) => {
                assert_eq!(err, TransportError::DeadlineExceeded);
                break;
            }
        }
    }

    assert_eq!(received, vec![0, 1, 2]);
    assert_eq!(start.elapsed(), Duration::from_millis(70));
}

#[tokio::test(start_paused = true)]
async fn closed_stream_releases_its_context() {
    let client = build_stream_pipeline(
        TickServer {
            interval: Duration::from_millis(20),
        },
        &config(0, 60_000),
    );

    let mut stream = client
        .oneshot(StreamCall::new(
            StreamDescriptor::server_streaming("Ticks"),
            "/clock.Clock/Ticks",
        ))
        .await
        .unwrap();
    assert_eq!(stream.next().await, Some(Ok(0)));

    let ctx = stream.context().cloned().unwrap();
    stream.release();

    assert!(ctx.is_done());
    assert_eq!(stream.next().await, Some(Err(TransportError::Canceled)));
    assert_eq!(stream.next().await, None);
}
