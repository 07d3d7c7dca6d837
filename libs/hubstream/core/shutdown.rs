use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation shared by the supervisor and its owner
///
/// Once triggered it stays triggered. The supervisor awaits
/// [`ShutdownSignal::triggered`] alongside every blocking point (connect,
/// read, backoff sleep), so shutdown takes effect without waiting for the
/// network.
///
/// Cloning is cheap; all clones observe the same signal, which lets several
/// clients be stopped together:
///
/// ```ignore
/// let shutdown = ShutdownSignal::new();
///
/// let orders = hubstream::builder()
///     .address("hub.local:7070")
///     .subscriber_id("orders-worker")
///     .shutdown_signal(shutdown.clone())
///     .build()
///     .await?;
///
/// // Later, from any task or thread:
/// shutdown.trigger();
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Request shutdown
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns on trigger.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
