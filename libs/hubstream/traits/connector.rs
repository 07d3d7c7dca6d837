use crate::error::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Byte stream carrying frames to and from the hub
pub trait HubStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> HubStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Owned, type-erased stream returned by a [`Connector`]
pub type BoxedStream = Box<dyn HubStream>;

/// Trait for opening a new transport to the hub
///
/// Both the supervisor (long-lived read session) and the publisher
/// (one short-lived session per publish) go through this seam. The
/// production implementation is `TlsConnector`; tests plug in in-memory
/// streams.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Dial the hub and complete any handshake
    ///
    /// Returns only fully established streams. A failure here is
    /// recoverable from the supervisor's point of view.
    async fn connect(&self) -> Result<BoxedStream>;

    /// Hub address, for logging
    fn address(&self) -> &str;
}
