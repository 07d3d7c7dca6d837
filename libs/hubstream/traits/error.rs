use thiserror::Error;

/// Main error type for hubstream
#[derive(Error, Debug)]
pub enum HubError {
    /// Hub address could not be resolved to a socket address
    #[error("Address resolution failed for '{address}': {reason}")]
    AddressResolution { address: String, reason: String },

    /// Client certificate or key could not be loaded
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// TLS configuration or handshake error
    #[error("TLS error: {0}")]
    Tls(String),

    /// TCP dial failed
    #[error("Connect error: {0}")]
    Connect(String),

    /// Socket read/write error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection closed by the peer
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Frame could not be parsed into a message
    #[error("Parse error: {0}")]
    Parse(String),

    /// Topic is empty or contains a frame delimiter
    #[error("Invalid topic: {0:?}")]
    InvalidTopic(String),

    /// Payload cannot be carried in the configured wire format
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Message handler reported a failure
    #[error("Handler error: {0}")]
    Handler(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Client has been shut down
    #[error("Client shut down")]
    Shutdown,
}

impl HubError {
    /// Errors that end the current session but leave the supervisor retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HubError::Tls(_)
                | HubError::Connect(_)
                | HubError::Io(_)
                | HubError::ConnectionClosed(_)
                | HubError::Timeout(_)
        )
    }
}

/// Result type for hubstream operations
pub type Result<T> = std::result::Result<T, HubError>;
