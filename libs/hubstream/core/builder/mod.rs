pub mod states;

use super::client::HubClient;
use super::codec::WireFormat;
use super::config::{ClientConfig, DEFAULT_READ_BUFFER_SIZE};
use super::dispatcher::{DEFAULT_DISPATCH_WORKERS, DEFAULT_QUEUE_CAPACITY};
use super::frame_decoder::DEFAULT_MAX_FRAME_LEN;
use super::session::{resolve, PlainConnector};
use super::shutdown::ShutdownSignal;
use super::tls::{TlsConnector, TlsSettings};
use crate::traits::*;
use states::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How the client reaches the hub
enum Transport {
    /// Mutual TLS (the default)
    Tls(TlsSettings),
    /// Unencrypted TCP
    Plaintext,
    /// Caller-supplied connector; the address is only a label
    Custom(Arc<dyn Connector>),
}

/// Everything optional, carried unchanged across type-state transitions
struct Options {
    topics: Vec<String>,
    debug: bool,
    handler: Option<Arc<dyn MessageHandler>>,
    parser: Option<Arc<dyn FrameParser>>,
    wire_format: WireFormat,
    transport: Transport,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    reconnection_delay_offset: Duration,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    read_buffer_size: usize,
    max_frame_len: usize,
    dispatch_workers: usize,
    queue_capacity: usize,
    shutdown: Option<ShutdownSignal>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            debug: false,
            handler: None,
            parser: None,
            wire_format: WireFormat::default(),
            transport: Transport::Tls(TlsSettings::default()),
            reconnect_strategy: None,
            reconnection_delay_offset: Duration::from_secs(0),
            connect_timeout: None,
            read_timeout: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            dispatch_workers: DEFAULT_DISPATCH_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown: None,
        }
    }
}

/// Type-state builder for [`HubClient`]
///
/// The hub address and the subscriber id are required; the type system
/// makes `build()` unavailable until both are set.
///
/// # Example
/// ```ignore
/// let client = hubstream::builder()
///     .address("hub.internal:7070")
///     .subscriber_id("orders-worker")
///     .topics(["orders", "payments"])
///     .handler(|message: Message| println!("{}", message.topic()))
///     .tls(TlsSettings::new("client.pem", "client.key").ca_path("ca.pem"))
///     .build()
///     .await?;
///
/// client.start()?;
/// client.publish("orders", "created.42").await?;
/// ```
pub struct HubClientBuilder<A, I>
where
    A: AddressState,
    I: IdentityState,
{
    _state: TypeState<A, I>,
    address: Option<String>,
    subscriber_id: Option<String>,
    options: Options,
}

impl HubClientBuilder<NoAddress, NoIdentity> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            address: None,
            subscriber_id: None,
            options: Options::default(),
        }
    }
}

impl Default for HubClientBuilder<NoAddress, NoIdentity> {
    fn default() -> Self {
        Self::new()
    }
}

// Address setting
impl<I> HubClientBuilder<NoAddress, I>
where
    I: IdentityState,
{
    /// Hub address as `host:port`
    pub fn address(self, address: impl Into<String>) -> HubClientBuilder<HasAddress, I> {
        HubClientBuilder {
            _state: TypeState::new(),
            address: Some(address.into()),
            subscriber_id: self.subscriber_id,
            options: self.options,
        }
    }
}

// Identity setting
impl<A> HubClientBuilder<A, NoIdentity>
where
    A: AddressState,
{
    /// Identity stamped on every published frame
    pub fn subscriber_id(self, id: impl Into<String>) -> HubClientBuilder<A, HasIdentity> {
        HubClientBuilder {
            _state: TypeState::new(),
            address: self.address,
            subscriber_id: Some(id.into()),
            options: self.options,
        }
    }
}

// Optional configuration methods
impl<A, I> HubClientBuilder<A, I>
where
    A: AddressState,
    I: IdentityState,
{
    /// Advisory topics of interest
    pub fn topics<T, S>(mut self, topics: T) -> Self
    where
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.topics.extend(topics.into_iter().map(Into::into));
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.options.topics.push(topic.into());
        self
    }

    /// Log every failure at warn level
    pub fn debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    /// Handler invoked (on dispatcher threads) for every decoded message
    pub fn handler(mut self, handler: impl MessageHandler) -> Self {
        self.options.handler = Some(Arc::new(handler));
        self
    }

    /// Replace the parser implied by the wire format
    pub fn parser(mut self, parser: impl FrameParser) -> Self {
        self.options.parser = Some(Arc::new(parser));
        self
    }

    pub fn wire_format(mut self, format: WireFormat) -> Self {
        self.options.wire_format = format;
        self
    }

    /// Connect over mutual TLS with these settings
    pub fn tls(mut self, settings: TlsSettings) -> Self {
        self.options.transport = Transport::Tls(settings);
        self
    }

    /// Connect over plain TCP
    pub fn plaintext(mut self) -> Self {
        self.options.transport = Transport::Plaintext;
        self
    }

    /// Use a custom connector for both reading and publishing
    ///
    /// The configured address is not resolved and only appears in logs.
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.options.transport = Transport::Custom(Arc::new(connector));
        self
    }

    /// Pacing for failed handshakes (default: every 10 seconds, forever)
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.options.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Wait applied after a live session drops, before reconnecting
    ///
    /// Handshake failures are paced by the reconnection strategy instead.
    pub fn reconnection_delay_offset(mut self, offset: Duration) -> Self {
        self.options.reconnection_delay_offset = offset;
        self
    }

    /// Limit for TCP connect plus handshake
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = Some(timeout);
        self
    }

    /// End the session when no data arrives for this long
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout = Some(timeout);
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.options.read_buffer_size = size;
        self
    }

    /// Longest frame accepted before it is discarded
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.options.max_frame_len = len;
        self
    }

    pub fn dispatch_workers(mut self, workers: usize) -> Self {
        self.options.dispatch_workers = workers;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.options.queue_capacity = capacity;
        self
    }

    /// Share a shutdown signal with other components
    ///
    /// By default each client owns its own signal, reachable through
    /// [`HubClient::shutdown_signal`].
    pub fn shutdown_signal(mut self, signal: ShutdownSignal) -> Self {
        self.options.shutdown = Some(signal);
        self
    }
}

// Build method - only available when all required fields are set
impl HubClientBuilder<HasAddress, HasIdentity> {
    /// Validate the configuration, resolve the address and load certificates
    ///
    /// Resolution and certificate failures are fatal here; the supervisor
    /// is not started until [`HubClient::start`].
    pub async fn build(self) -> Result<HubClient> {
        let address = self
            .address
            .ok_or_else(|| HubError::Configuration("address must be set".to_string()))?;
        let subscriber_id = self
            .subscriber_id
            .ok_or_else(|| HubError::Configuration("subscriber id must be set".to_string()))?;
        let options = self.options;

        options.wire_format.validate_subscriber_id(&subscriber_id)?;
        for topic in &options.topics {
            options.wire_format.validate_topic(topic)?;
        }
        require_positive("read buffer size", options.read_buffer_size)?;
        require_positive("max frame length", options.max_frame_len)?;
        require_positive("dispatch workers", options.dispatch_workers)?;
        require_positive("queue capacity", options.queue_capacity)?;

        let connector: Arc<dyn Connector> = match options.transport {
            Transport::Custom(connector) => connector,
            Transport::Plaintext => {
                let resolved = resolve(&address).await?;
                debug!("Resolved {} to {}", address, resolved.socket_addr());
                Arc::new(PlainConnector::new(resolved, options.connect_timeout))
            }
            Transport::Tls(settings) => {
                let resolved = resolve(&address).await?;
                debug!("Resolved {} to {}", address, resolved.socket_addr());
                Arc::new(TlsConnector::new(resolved, &settings, options.connect_timeout)?)
            }
        };

        let custom_parser = options.parser.is_some();
        let parser = options
            .parser
            .unwrap_or_else(|| options.wire_format.default_parser());

        let strategy = options
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(FixedDelay::default()));

        let config = ClientConfig {
            address,
            subscriber_id,
            debug: options.debug,
            wire_format: options.wire_format,
            parser,
            custom_parser,
            handler: options.handler,
            connector,
            reconnection_delay_offset: options.reconnection_delay_offset,
            read_timeout: options.read_timeout,
            read_buffer_size: options.read_buffer_size,
            max_frame_len: options.max_frame_len,
            dispatch_workers: options.dispatch_workers,
            queue_capacity: options.queue_capacity,
            shutdown: options.shutdown.unwrap_or_default(),
        };

        HubClient::new(config, strategy, options.topics)
    }
}

fn require_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(HubError::Configuration(format!("{} must be greater than zero", name)));
    }
    Ok(())
}
