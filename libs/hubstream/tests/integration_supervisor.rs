//! Integration tests for the connection supervisor
//!
//! These tests drive a real `HubClient` against scripted in-memory
//! connectors.

mod common;

use common::{Attempt, CollectingHandler, MockConnector, WhenExhausted};
use hubstream::codec;
use hubstream::{ClientEvent, ConnectionState, FixedDelay, Message};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_back_to_back_frames_reach_slow_handler_in_order() {
    verbose_println!("Testing back-to-back frames with a slow handler...");

    let (client_side, mut hub_side) = tokio::io::duplex(4096);
    let connector = MockConnector::new(vec![Attempt::Stream(client_side)], WhenExhausted::Hang);
    let handler = CollectingHandler::slow(Duration::from_millis(10));

    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(connector.clone())
        .handler(handler.clone())
        .dispatch_workers(1)
        .queue_capacity(2)
        .build()
        .await
        .unwrap();
    client.start().unwrap();

    // Twenty frames in a single write, then one frame split over two writes.
    let burst: Vec<u8> = (0..20)
        .flat_map(|i| codec::encode("hub", "orders", format!("created.{}", i).as_bytes()))
        .collect();
    hub_side.write_all(&burst).await.unwrap();
    hub_side.write_all(b"hub.orders.crea").await.unwrap();
    hub_side.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    hub_side.write_all(b"ted.20\n").await.unwrap();

    assert!(common::wait_until(WAIT, || handler.len() == 21).await);

    let payloads: Vec<String> = handler
        .messages()
        .iter()
        .map(|m| m.payload_str().unwrap().to_string())
        .collect();
    let expected: Vec<String> = (0..21).map(|i| format!("created.{}", i)).collect();
    assert_eq!(payloads, expected);
    verbose_println!("  All 21 frames delivered in socket order");

    let metrics = client.metrics();
    assert_eq!(metrics.frames_received, 21);
    assert_eq!(metrics.malformed_frames, 0);
    assert_eq!(connector.connects(), 1);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_read_error_triggers_exactly_one_handshake() {
    verbose_println!("Testing reconnect after a read error...");

    let connector = MockConnector::new(vec![Attempt::ReadError], WhenExhausted::Hang);
    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(connector.clone())
        .build()
        .await
        .unwrap();
    client.start().unwrap();

    assert!(common::wait_until(WAIT, || connector.connects() == 2).await);

    // Nothing else happens while the second handshake is pending.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(connector.connects(), 2);
    assert_eq!(client.connection_state(), ConnectionState::Connecting);

    let events: Vec<ClientEvent> = std::iter::from_fn(|| client.try_recv_event()).collect();
    verbose_println!("  Events: {:?}", events);
    assert_eq!(events[0], ClientEvent::Connected);
    assert_eq!(events[1], ClientEvent::Disconnected);
    assert!(matches!(events[2], ClientEvent::Error(_)));
    assert_eq!(events[3], ClientEvent::Reconnecting(0));

    client.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failed_handshakes_follow_fixed_delay() {
    verbose_println!("Testing 10 second cadence against an unreachable hub...");

    let connector = MockConnector::failing();
    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(connector.clone())
        .reconnect_strategy(FixedDelay::default())
        .build()
        .await
        .unwrap();
    client.start().unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(connector.connects(), 1);

    // Attempts at 0s, 10s, 20s and 30s.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.connects(), 4);

    let metrics = client.metrics();
    assert_eq!(metrics.handshakes, 4);
    assert_eq!(metrics.reconnect_count, 3);
    assert_eq!(metrics.connection_state, ConnectionState::Disconnected);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_custom_parser_invoked_for_every_frame() {
    verbose_println!("Testing custom parser invocation...");

    let calls = Arc::new(AtomicUsize::new(0));
    let parser = {
        let calls = Arc::clone(&calls);
        move |frame: &[u8]| {
            calls.fetch_add(1, Ordering::SeqCst);
            codec::decode(frame)
        }
    };

    let (client_side, mut hub_side) = tokio::io::duplex(1024);
    let connector = MockConnector::new(vec![Attempt::Stream(client_side)], WhenExhausted::Hang);
    let handler = CollectingHandler::new();

    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(connector)
        .parser(parser)
        .handler(handler.clone())
        .build()
        .await
        .unwrap();
    assert!(client.config().has_custom_parser());
    client.start().unwrap();

    hub_side
        .write_all(b"a.b.c.d\nnodots\nx.y.z.w\n1.2\np.q.r.s\n")
        .await
        .unwrap();

    assert!(common::wait_until(WAIT, || handler.len() == 3).await);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(client.metrics().malformed_frames, 2);

    let topics: Vec<String> = handler.messages().iter().map(|m| m.topic().to_string()).collect();
    assert_eq!(topics, vec!["b", "y", "q"]);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_and_oversized_frames_do_not_break_the_loop() {
    verbose_println!("Testing malformed frame handling...");

    let (client_side, mut hub_side) = tokio::io::duplex(1024);
    let connector = MockConnector::new(vec![Attempt::Stream(client_side)], WhenExhausted::Hang);
    let handler = CollectingHandler::new();

    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(connector.clone())
        .handler(handler.clone())
        .max_frame_len(32)
        .build()
        .await
        .unwrap();
    client.start().unwrap();

    let oversized = format!("hub.orders.created.{}\n", "9".repeat(64));
    hub_side.write_all(b"bad-frame-no-dots\n").await.unwrap();
    hub_side.write_all(oversized.as_bytes()).await.unwrap();
    hub_side.write_all(b"hub.orders.created.42\n").await.unwrap();

    assert!(common::wait_until(WAIT, || handler.len() == 1).await);
    assert_eq!(handler.messages()[0], Message::new("hub", "orders", "created.42"));
    assert_eq!(client.metrics().malformed_frames, 2);
    assert_eq!(connector.connects(), 1);

    let malformed = std::iter::from_fn(|| client.try_recv_event())
        .filter(|e| matches!(e, ClientEvent::MalformedFrame { .. }))
        .count();
    assert_eq!(malformed, 2);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_during_backoff_is_prompt() {
    verbose_println!("Testing shutdown while waiting to reconnect...");

    let connector = MockConnector::failing();
    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(connector.clone())
        .build()
        .await
        .unwrap();
    client.start().unwrap();

    assert!(common::wait_until(WAIT, || connector.connects() == 1).await);

    // The default strategy would sleep 10 seconds here.
    tokio::time::timeout(Duration::from_secs(1), client.shutdown())
        .await
        .expect("shutdown should not wait for the backoff")
        .unwrap();
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_shutdown_while_reading() {
    verbose_println!("Testing shutdown with a live session...");

    let (client_side, _hub_side) = tokio::io::duplex(64);
    let connector = MockConnector::new(vec![Attempt::Stream(client_side)], WhenExhausted::Hang);
    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(connector.clone())
        .build()
        .await
        .unwrap();
    let shutdown = client.shutdown_signal().clone();
    client.start().unwrap();

    assert!(common::wait_until(WAIT, || client.connection_state() == ConnectionState::ReadingLoop).await);
    assert!(client.is_connected());

    tokio::time::timeout(Duration::from_secs(1), client.shutdown())
        .await
        .expect("shutdown should interrupt the blocked read")
        .unwrap();
    assert!(shutdown.is_triggered());
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_strategy_exhaustion_stops_supervisor() {
    verbose_println!("Testing strategy exhaustion...");

    let connector = MockConnector::failing();
    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(connector.clone())
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(10), Some(2)))
        .build()
        .await
        .unwrap();
    client.start().unwrap();

    assert!(common::wait_until(WAIT, || connector.connects() == 3).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(connector.connects(), 3);
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_successful_session_restarts_attempt_count() {
    verbose_println!("Testing failure count reset after a live session...");

    // One failure allowed: fail, connect, fail, fail. Without the reset the
    // supervisor would give up on the third attempt.
    let connector = MockConnector::new(
        vec![Attempt::Fail, Attempt::ReadError, Attempt::Fail],
        WhenExhausted::Fail,
    );
    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(connector.clone())
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(10), Some(1)))
        .build()
        .await
        .unwrap();
    client.start().unwrap();

    assert!(common::wait_until(WAIT, || connector.connects() == 4).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(connector.connects(), 4);
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_hub_close_reconnects_after_delay_offset() {
    verbose_println!("Testing reconnect after the hub closes the session...");

    let (first, hub_first) = tokio::io::duplex(64);
    let (second, _hub_second) = tokio::io::duplex(64);
    let connector = MockConnector::new(
        vec![Attempt::Stream(first), Attempt::Stream(second)],
        WhenExhausted::Hang,
    );
    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(connector.clone())
        .reconnection_delay_offset(Duration::from_millis(50))
        .build()
        .await
        .unwrap();
    client.start().unwrap();

    assert!(common::wait_until(WAIT, || client.is_connected()).await);
    drop(hub_first);

    assert!(common::wait_until(WAIT, || connector.connects() == 2).await);
    assert!(common::wait_until(WAIT, || client.is_connected()).await);
    assert_eq!(client.metrics().reconnect_count, 1);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_cannot_start_twice() {
    let client = hubstream::builder()
        .address("mock-hub:7070")
        .subscriber_id("3456")
        .connector(MockConnector::new(Vec::new(), WhenExhausted::Hang))
        .build()
        .await
        .unwrap();

    client.start().unwrap();
    assert!(client.start().is_err());
    client.shutdown().await.unwrap();
}
