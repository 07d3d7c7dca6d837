//! Message Handler
//!
//! Decoded messages leave the read loop through the dispatcher, which runs
//! the handler on a pool of worker threads:
//!
//! ```text
//! Socket → FrameDecoder → FrameParser → Dispatcher queue → Worker 1 → Handler
//!                                             (bounded)  → Worker 2 → Handler
//!                                                        → Worker N → Handler
//! ```
//!
//! Frames are parsed and queued in socket order. Once queued, several workers
//! may run the handler at the same time, so delivery order is not preserved.

use crate::error::Result;
use crate::parser::Message;

/// Handler invoked for every decoded message
///
/// The same handler instance is shared by all dispatcher workers and must be
/// safe to call concurrently with itself. It runs on a dedicated OS thread,
/// so blocking work is fine.
///
/// Closures of the form `Fn(Message)` implement this trait.
///
/// # Example
///
/// ```ignore
/// struct OrderCounter {
///     orders: Arc<AtomicU64>,
/// }
///
/// impl MessageHandler for OrderCounter {
///     fn handle(&self, message: Message) -> Result<()> {
///         if message.topic() == "orders" {
///             self.orders.fetch_add(1, Ordering::Relaxed);
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle one message
    ///
    /// # Errors
    /// Errors are logged and the worker moves on to the next message.
    fn handle(&self, message: Message) -> Result<()>;
}

impl<F> MessageHandler for F
where
    F: Fn(Message) + Send + Sync + 'static,
{
    fn handle(&self, message: Message) -> Result<()> {
        self(message);
        Ok(())
    }
}
