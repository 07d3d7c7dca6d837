//! # hubstream
//!
//! Reconnecting streaming client for a newline-framed pub/sub hub over
//! mutual TLS.
//!
//! ## Features
//!
//! - **Self-healing connection**: a supervisor task reconnects after read
//!   errors and paces failed handshakes with a pluggable strategy
//! - **Streaming decoder**: frames split across reads or packed into one read
//!   are reassembled before parsing
//! - **Bounded dispatch**: handlers run on worker threads behind a bounded queue
//! - **Synchronous publish**: each publish writes and flushes on its own session
//! - **Type-state builder**: address and subscriber id are required at compile time

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    builder, client, codec, config, connection_state, dispatcher, frame_decoder, publisher,
    session, shutdown, tls,
    builder::{states, HubClientBuilder},
    client::{ClientEvent, HubClient, Metrics},
    codec::WireFormat,
    config::ClientConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    dispatcher::Dispatcher,
    frame_decoder::{DecodedFrame, FrameDecoder},
    publisher::Publisher,
    session::{PlainConnector, ResolvedAddress, Session},
    shutdown::ShutdownSignal,
    tls::{TlsConnector, TlsSettings},
};
