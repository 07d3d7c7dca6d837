//! # Core client
//!
//! Codec, transport, supervisor, dispatcher and the `HubClient` facade.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hubstream::{Message, TlsSettings};
//!
//! #[tokio::main]
//! async fn main() -> hubstream::Result<()> {
//!     let client = hubstream::builder()
//!         .address("hub.internal:7070")
//!         .subscriber_id("3456")
//!         .topic("orders")
//!         .tls(TlsSettings::new("client.pem", "client.key"))
//!         .handler(|message: Message| {
//!             println!("{} -> {:?}", message.topic(), message.payload_str());
//!         })
//!         .build()
//!         .await?;
//!
//!     client.start()?;
//!     client.publish("orders", "created.42").await?;
//!
//!     while let Ok(event) = client.recv_event() {
//!         println!("Event: {:?}", event);
//!     }
//!
//!     client.shutdown().await
//! }
//! ```

/// Log a failure at warn level when `$debug` is set, otherwise at debug level
macro_rules! report {
    ($debug:expr, $($arg:tt)*) => {
        if $debug {
            tracing::warn!($($arg)*)
        } else {
            tracing::debug!($($arg)*)
        }
    };
}

pub mod builder;
pub mod client;
pub mod codec;
pub mod config;
pub mod connection_state;
pub mod dispatcher;
pub mod frame_decoder;
pub mod publisher;
pub mod session;
pub mod shutdown;
pub mod tls;

mod supervisor;

// Re-export main types
pub use builder::{states, HubClientBuilder};
pub use client::{ClientEvent, HubClient, Metrics};
pub use codec::WireFormat;
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use dispatcher::Dispatcher;
pub use frame_decoder::{DecodedFrame, FrameDecoder};
pub use publisher::Publisher;
pub use session::{resolve, PlainConnector, ResolvedAddress, Session};
pub use shutdown::ShutdownSignal;
pub use tls::{TlsConnector, TlsSettings};

/// Create a new client builder
///
/// ```ignore
/// let client = hubstream::builder()
///     .address("127.0.0.1:7070")
///     .subscriber_id("3456")
///     .plaintext()
///     .build()
///     .await?;
/// ```
pub fn builder() -> HubClientBuilder<states::NoAddress, states::NoIdentity> {
    HubClientBuilder::new()
}
