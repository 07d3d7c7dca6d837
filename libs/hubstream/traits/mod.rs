//! # hubstream traits
//!
//! Seams of the streaming client:
//!
//! - **FrameParser**: Turn one inbound frame into a `Message`
//! - **MessageHandler**: Consume decoded messages on dispatcher workers
//! - **ReconnectionStrategy**: Pace connect attempts after a failed handshake
//! - **Connector**: Open a transport to the hub (TLS in production)

pub mod connector;
pub mod error;
pub mod handler;
pub mod parser;
pub mod reconnect;

pub use connector::{BoxedStream, Connector, HubStream};
pub use error::{HubError, Result};
pub use handler::MessageHandler;
pub use parser::{DottedParser, EscapedParser, FrameParser, Message};
pub use reconnect::{
    ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy, DEFAULT_RECONNECT_DELAY,
};
