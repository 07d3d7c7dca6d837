use crate::error::{HubError, Result};
use crate::traits::{BoxedStream, Connector};
use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Hub address resolved once, when the client is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    original: String,
    host: String,
    socket: SocketAddr,
}

impl ResolvedAddress {
    /// `host:port` exactly as configured
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Host part without port or IPv6 brackets
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.socket
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Resolve `host:port`, keeping the first address returned
pub async fn resolve(address: &str) -> Result<ResolvedAddress> {
    let resolution_error = |reason: String| HubError::AddressResolution {
        address: address.to_string(),
        reason,
    };

    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| resolution_error("expected host:port".to_string()))?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(resolution_error("expected host:port".to_string()));
    }

    let socket = tokio::net::lookup_host(address)
        .await
        .map_err(|e| resolution_error(e.to_string()))?
        .next()
        .ok_or_else(|| resolution_error("no addresses found".to_string()))?;

    Ok(ResolvedAddress {
        original: address.to_string(),
        host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
        socket,
    })
}

pub(crate) async fn connect_tcp(address: &ResolvedAddress) -> Result<TcpStream> {
    let stream = TcpStream::connect(address.socket_addr())
        .await
        .map_err(|e| HubError::Connect(format!("dial {} failed: {}", address, e)))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Unencrypted TCP [`Connector`], for hubs on a trusted loopback or in tests
pub struct PlainConnector {
    address: ResolvedAddress,
    connect_timeout: Option<Duration>,
}

impl PlainConnector {
    pub fn new(address: ResolvedAddress, connect_timeout: Option<Duration>) -> Self {
        Self {
            address,
            connect_timeout,
        }
    }
}

#[async_trait]
impl Connector for PlainConnector {
    async fn connect(&self) -> Result<BoxedStream> {
        let stream = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect_tcp(&self.address))
                .await
                .map_err(|_| {
                    HubError::Timeout(format!("connect to {} exceeded {:?}", self.address, limit))
                })??,
            None => connect_tcp(&self.address).await?,
        };
        Ok(Box::new(stream))
    }

    fn address(&self) -> &str {
        self.address.as_str()
    }
}

/// One live connection to the hub
///
/// A session only exists once the connector has completed its handshake.
/// After [`Session::close`] every read and write fails.
pub struct Session {
    address: String,
    stream: Option<BoxedStream>,
    debug: bool,
}

impl Session {
    pub fn new(address: impl Into<String>, stream: BoxedStream, debug: bool) -> Self {
        Self {
            address: address.into(),
            stream: Some(stream),
            debug,
        }
    }

    /// Dial through `connector` and wrap the resulting stream
    pub async fn open(connector: &dyn Connector, debug: bool) -> Result<Self> {
        let stream = connector.connect().await?;
        Ok(Self::new(connector.address(), stream, debug))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Read whatever is available, blocking until at least one byte arrives
    ///
    /// `Ok(0)` means the hub closed the connection.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream_mut()?;
        Ok(stream.read(buf).await?)
    }

    /// Write a complete frame and flush it
    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        stream.write_all(frame).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Shut the stream down; calling it again is a no-op
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                report!(self.debug, "Error closing session with {}: {}", self.address, e);
            } else {
                debug!("Session with {} closed", self.address);
            }
        }
    }

    fn stream_mut(&mut self) -> Result<&mut BoxedStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| HubError::ConnectionClosed(format!("session with {} is closed", self.address)))
    }
}
