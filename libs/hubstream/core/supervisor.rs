//! Connection supervisor
//!
//! Drives `connect → read until error → reconnect` for as long as the client
//! runs. Failed handshakes are paced by the reconnection strategy; a session
//! that drops after connecting is replaced immediately (after the optional
//! delay offset). Shutdown is observed while connecting, while reading and
//! while sleeping.

use super::client::ClientEvent;
use super::config::ClientConfig;
use super::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use super::dispatcher::Dispatcher;
use super::frame_decoder::{DecodedFrame, FrameDecoder};
use super::session::Session;
use crate::error::{HubError, Result};
use crate::traits::ReconnectionStrategy;
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// How a read loop ended
enum ReadOutcome {
    /// Shutdown requested; stop supervising
    Shutdown,
    /// Session lost; reconnect
    Lost(HubError),
}

pub(crate) struct Supervisor {
    config: Arc<ClientConfig>,
    strategy: Box<dyn ReconnectionStrategy>,
    dispatcher: Arc<Dispatcher>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    events: Sender<ClientEvent>,
}

impl Supervisor {
    pub(crate) fn new(
        config: Arc<ClientConfig>,
        strategy: Box<dyn ReconnectionStrategy>,
        dispatcher: Arc<Dispatcher>,
        state: Arc<AtomicConnectionState>,
        metrics: Arc<AtomicMetrics>,
        events: Sender<ClientEvent>,
    ) -> Self {
        Self {
            config,
            strategy,
            dispatcher,
            state,
            metrics,
            events,
        }
    }

    /// Supervise until shutdown or until the strategy gives up
    pub(crate) async fn run(self) {
        let address = self.config.connector.address().to_string();
        let debug = self.config.debug;
        let shutdown = self.config.shutdown.clone();
        let mut failed_attempts = 0usize;
        let mut first_attempt = true;

        loop {
            if shutdown.is_triggered() {
                debug!("Shutdown requested, supervisor exiting");
                break;
            }

            self.state.set(ConnectionState::Connecting);
            if !first_attempt {
                let _ = self.events.send(ClientEvent::Reconnecting(failed_attempts));
            }
            first_attempt = false;

            let connected = tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                result = self.config.connector.connect() => result,
            };
            self.metrics.increment_handshakes();

            match connected {
                Ok(stream) => {
                    info!("Connected to hub at {}", address);
                    self.state.set(ConnectionState::Connected);
                    let _ = self.events.send(ClientEvent::Connected);
                    failed_attempts = 0;

                    let mut session = Session::new(address.as_str(), stream, debug);
                    let outcome = self.read_loop(&mut session).await;
                    session.close().await;

                    self.state.set(ConnectionState::Disconnected);
                    let _ = self.events.send(ClientEvent::Disconnected);

                    match outcome {
                        ReadOutcome::Shutdown => break,
                        ReadOutcome::Lost(e) => {
                            report!(debug, "Session with {} ended: {}", address, e);
                            let _ = self.events.send(ClientEvent::Error(e.to_string()));
                        }
                    }

                    let offset = self.config.reconnection_delay_offset;
                    if !offset.is_zero() {
                        debug!("Waiting reconnection delay offset: {:?}", offset);
                        if !self.sleep_unless_shutdown(offset).await {
                            break;
                        }
                    }
                    self.metrics.increment_reconnects();
                }
                Err(e) => {
                    report!(debug, "Failed to connect to {}: {}", address, e);
                    let _ = self.events.send(ClientEvent::Error(e.to_string()));
                    self.state.set(ConnectionState::Disconnected);

                    let Some(delay) = self.strategy.next_delay(failed_attempts) else {
                        warn!(
                            "Reconnection strategy exhausted after {} attempts, giving up on {}",
                            failed_attempts + 1,
                            address
                        );
                        break;
                    };

                    debug!("Reconnecting in {:?} (attempt {})", delay, failed_attempts + 1);
                    if !self.sleep_unless_shutdown(delay).await {
                        break;
                    }
                    failed_attempts += 1;
                    self.metrics.increment_reconnects();
                }
            }
        }

        self.state.set(ConnectionState::Disconnected);
        info!("Supervisor for {} exiting", address);
    }

    /// Read, split, parse and dispatch until the session fails
    async fn read_loop(&self, session: &mut Session) -> ReadOutcome {
        self.state.set(ConnectionState::ReadingLoop);

        let shutdown = &self.config.shutdown;
        let mut buffer = vec![0u8; self.config.read_buffer_size];
        let mut decoder = FrameDecoder::new(self.config.max_frame_len);

        loop {
            let read = tokio::select! {
                biased;
                _ = shutdown.triggered() => return ReadOutcome::Shutdown,
                result = read_with_timeout(session, &mut buffer, self.config.read_timeout) => result,
            };

            let n = match read {
                Ok(0) => {
                    return ReadOutcome::Lost(HubError::ConnectionClosed(
                        "hub closed the connection".into(),
                    ))
                }
                Ok(n) => n,
                Err(e) => return ReadOutcome::Lost(e),
            };
            trace!("Read {} bytes from {}", n, session.address());

            decoder.extend(&buffer[..n]);
            while let Some(decoded) = decoder.next_frame() {
                match decoded {
                    DecodedFrame::Frame(frame) => {
                        self.metrics.increment_received();
                        match self.config.parser.parse(&frame) {
                            Ok(message) => {
                                if let Err(e) = self.dispatcher.deliver(message).await {
                                    return match e {
                                        HubError::Shutdown => ReadOutcome::Shutdown,
                                        other => ReadOutcome::Lost(other),
                                    };
                                }
                            }
                            Err(e) => self.malformed(frame.len(), e.to_string()),
                        }
                    }
                    DecodedFrame::Oversized(len) => self.malformed(
                        len,
                        format!("frame exceeds {} bytes", self.config.max_frame_len),
                    ),
                }
            }
        }
    }

    fn malformed(&self, len: usize, reason: String) {
        self.metrics.increment_malformed();
        report!(self.config.debug, "Dropping malformed frame ({} bytes): {}", len, reason);
        let _ = self.events.send(ClientEvent::MalformedFrame { len, reason });
    }

    /// Sleep for `duration`; returns `false` if shutdown arrived first
    async fn sleep_unless_shutdown(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.config.shutdown.triggered() => {
                debug!("Shutdown requested during reconnection delay");
                false
            }
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

async fn read_with_timeout(
    session: &mut Session,
    buffer: &mut [u8],
    limit: Option<Duration>,
) -> Result<usize> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, session.read(buffer))
            .await
            .map_err(|_| HubError::Timeout(format!("no data from hub for {:?}", limit)))?,
        None => session.read(buffer).await,
    }
}
