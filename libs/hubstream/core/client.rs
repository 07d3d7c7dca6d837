use super::config::ClientConfig;
use super::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use super::dispatcher::Dispatcher;
use super::publisher::Publisher;
use super::shutdown::ShutdownSignal;
use super::supervisor::Supervisor;
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Lifecycle events emitted by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Handshake with the hub completed
    Connected,
    /// The read session ended
    Disconnected,
    /// Connecting again (consecutive failed attempts so far)
    Reconnecting(usize),
    /// A frame was dropped because it could not be decoded
    MalformedFrame { len: usize, reason: String },
    /// Connect or read failure
    Error(String),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub malformed_frames: u64,
    pub handshakes: u64,
    pub reconnect_count: u64,
    pub queued_messages: usize,
    pub connection_state: ConnectionState,
}

/// Reconnecting streaming client for a pub/sub hub
///
/// - One supervisor task owns the read session and keeps it alive
/// - Decoded messages go through a bounded queue to handler threads
/// - `publish` opens its own session per call and never blocks the reader
///
/// Build one with [`hubstream::builder()`](crate::builder), then call
/// [`HubClient::start`] to begin receiving.
pub struct HubClient {
    config: Arc<ClientConfig>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    dispatcher: Arc<Dispatcher>,
    publisher: Publisher,
    strategy: Mutex<Option<Box<dyn ReconnectionStrategy>>>,
    topics: Vec<String>,
    event_tx: Sender<ClientEvent>,
    event_rx: Receiver<ClientEvent>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl HubClient {
    /// Called by the builder's `build()` method
    pub(crate) fn new(
        config: ClientConfig,
        strategy: Box<dyn ReconnectionStrategy>,
        topics: Vec<String>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));
        let metrics = Arc::new(AtomicMetrics::new());
        let (event_tx, event_rx) = unbounded();

        let dispatcher = Arc::new(Dispatcher::new(
            config.handler.clone(),
            config.dispatch_workers,
            config.queue_capacity,
            config.debug,
        )?);

        let publisher = Publisher::new(
            Arc::clone(&config.connector),
            config.subscriber_id.clone(),
            config.wire_format,
            Arc::clone(&metrics),
            config.debug,
        );

        Ok(Self {
            config,
            state,
            metrics,
            dispatcher,
            publisher,
            strategy: Mutex::new(Some(strategy)),
            topics,
            event_tx,
            event_rx,
            task_handle: Mutex::new(None),
        })
    }

    /// Spawn the connection supervisor
    ///
    /// Must be called from within a tokio runtime. A client can only be
    /// started once.
    pub fn start(&self) -> Result<()> {
        if self.config.shutdown.is_triggered() {
            return Err(HubError::Shutdown);
        }

        let strategy = self.strategy.lock().take().ok_or_else(|| {
            HubError::Configuration("client has already been started".to_string())
        })?;

        let supervisor = Supervisor::new(
            Arc::clone(&self.config),
            strategy,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.state),
            Arc::clone(&self.metrics),
            self.event_tx.clone(),
        );

        info!(
            "Starting hub client '{}' for {}",
            self.config.subscriber_id,
            self.config.connector.address()
        );
        *self.task_handle.lock() = Some(tokio::spawn(supervisor.run()));
        Ok(())
    }

    /// Publish one message on its own session
    ///
    /// Returns once the frame has been written and flushed and the session
    /// closed. Write failures are returned; nothing is retried.
    pub async fn publish(&self, topic: &str, payload: impl AsRef<[u8]>) -> Result<()> {
        self.publisher.publish(topic, payload.as_ref()).await
    }

    /// Record topics of interest
    ///
    /// Topics are advisory metadata; the hub decides what is delivered.
    pub fn add_topics<I, S>(&mut self, topics: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let topics: Vec<String> = topics.into_iter().map(Into::into).collect();
        if topics.is_empty() {
            return Err(HubError::Configuration("no topics given".to_string()));
        }
        for topic in &topics {
            self.config.wire_format.validate_topic(topic)?;
        }
        self.topics.extend(topics);
        Ok(())
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn subscriber_id(&self) -> &str {
        &self.config.subscriber_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if a read session is live
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            frames_sent: self.metrics.frames_sent(),
            frames_received: self.metrics.frames_received(),
            malformed_frames: self.metrics.malformed_frames(),
            handshakes: self.metrics.handshakes(),
            reconnect_count: self.metrics.reconnect_count(),
            queued_messages: self.dispatcher.queued(),
            connection_state: self.state.get(),
        }
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Receive an event, waiting at most `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ClientEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Signal observed by the supervisor; triggering it stops reconnecting
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.config.shutdown
    }

    /// Stop the supervisor, drain the dispatch queue and join the workers
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down hub client '{}'", self.config.subscriber_id);

        self.config.shutdown.trigger();
        self.state.set(ConnectionState::ShuttingDown);

        let handle = self.task_handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                debug!("Supervisor task ended abnormally: {}", e);
            }
        }

        // Workers finish whatever is still queued before exiting.
        self.dispatcher.close();
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::task::spawn_blocking(move || dispatcher.join())
            .await
            .map_err(|e| HubError::Handler(format!("dispatch workers panicked: {}", e)))?;

        self.state.set(ConnectionState::Disconnected);
        info!("Hub client shut down");
        Ok(())
    }
}

impl Drop for HubClient {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.lock().take() {
            self.config.shutdown.trigger();
            handle.abort();
        }
        self.dispatcher.close();
    }
}
