use super::codec::WireFormat;
use super::connection_state::AtomicMetrics;
use super::session::Session;
use crate::error::Result;
use crate::traits::Connector;
use std::sync::Arc;
use tracing::debug;

/// Sends single frames to the hub, each on its own short-lived session
///
/// The publisher never touches the supervisor's read session. Every call
/// dials, writes and flushes the frame, then closes before returning, so a
/// successful `publish` means the bytes were handed to the transport.
pub struct Publisher {
    connector: Arc<dyn Connector>,
    subscriber_id: String,
    format: WireFormat,
    metrics: Arc<AtomicMetrics>,
    debug: bool,
}

impl Publisher {
    pub fn new(
        connector: Arc<dyn Connector>,
        subscriber_id: impl Into<String>,
        format: WireFormat,
        metrics: Arc<AtomicMetrics>,
        debug: bool,
    ) -> Self {
        Self {
            connector,
            subscriber_id: subscriber_id.into(),
            format,
            metrics,
            debug,
        }
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Publish `payload` on `topic`
    ///
    /// Errors from dialing or writing are returned as-is; nothing is retried.
    pub async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        self.format.validate_topic(topic)?;
        self.format.validate_payload(payload)?;
        let frame = self.format.encode(&self.subscriber_id, topic, payload);

        let mut session = match Session::open(self.connector.as_ref(), self.debug).await {
            Ok(session) => session,
            Err(e) => {
                report!(self.debug, "Publish on '{}' failed to connect: {}", topic, e);
                return Err(e);
            }
        };

        let written = session.write_frame(&frame).await;
        session.close().await;

        match written {
            Ok(()) => {
                self.metrics.increment_sent();
                debug!("Published {} bytes on '{}'", frame.len(), topic);
                Ok(())
            }
            Err(e) => {
                report!(self.debug, "Publish on '{}' failed: {}", topic, e);
                Err(e)
            }
        }
    }
}
