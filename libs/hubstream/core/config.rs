use super::codec::WireFormat;
use super::shutdown::ShutdownSignal;
use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Default size of the socket read buffer
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Configuration for a [`HubClient`](super::client::HubClient)
///
/// Produced by the type-state builder; everything the supervisor, publisher
/// and dispatcher need once the client is running.
pub struct ClientConfig {
    /// Hub address as configured (`host:port`)
    pub(crate) address: String,

    /// Identity stamped on every published frame
    pub(crate) subscriber_id: String,

    /// Log every failure at warn level instead of debug
    pub(crate) debug: bool,

    /// Encoding used by the publisher
    pub(crate) wire_format: WireFormat,

    /// Parser for inbound frames
    pub(crate) parser: Arc<dyn FrameParser>,

    /// Whether `parser` was supplied by the caller
    pub(crate) custom_parser: bool,

    /// Optional handler for decoded messages
    pub(crate) handler: Option<Arc<dyn MessageHandler>>,

    /// Transport used by both the read session and the publisher
    pub(crate) connector: Arc<dyn Connector>,

    /// Wait applied after a live session drops, before reconnecting
    pub(crate) reconnection_delay_offset: Duration,

    /// A read idle for longer than this ends the session
    pub(crate) read_timeout: Option<Duration>,

    /// Size of each socket read
    pub(crate) read_buffer_size: usize,

    /// Longest accepted frame
    pub(crate) max_frame_len: usize,

    /// Dispatcher worker threads
    pub(crate) dispatch_workers: usize,

    /// Dispatcher queue capacity
    pub(crate) queue_capacity: usize,

    /// Cancellation observed by the supervisor
    pub(crate) shutdown: ShutdownSignal,
}

impl ClientConfig {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn wire_format(&self) -> WireFormat {
        self.wire_format
    }

    /// Check if a caller-supplied parser replaces the default one
    pub fn has_custom_parser(&self) -> bool {
        self.custom_parser
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    pub fn dispatch_workers(&self) -> usize {
        self.dispatch_workers
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}
