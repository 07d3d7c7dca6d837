//! Bounded message dispatch
//!
//! # Architecture
//!
//! ```text
//! Read loop ──deliver()──> bounded crossbeam queue ──> Worker thread 1 ──> handler
//!   (tokio task)              (capacity N)         ──> Worker thread 2 ──> handler
//!                                                  ──> Worker thread K ──> handler
//! ```
//!
//! - **Non-blocking fast path**: `try_send` from the read loop
//! - **Backpressure**: when the queue is full the read loop waits on a
//!   blocking-pool thread, so the async runtime keeps running
//! - **Bounded**: at most `capacity` queued messages and `workers` handler
//!   invocations in flight

use crate::error::{HubError, Result};
use crate::traits::{Message, MessageHandler};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, trace};

/// Default number of handler threads
pub const DEFAULT_DISPATCH_WORKERS: usize = 4;

/// Default queue capacity between the read loop and the workers
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Hands decoded messages to the caller's handler off the read loop
pub struct Dispatcher {
    sender: Mutex<Option<Sender<Message>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    has_handler: bool,
    delivered: Arc<AtomicU64>,
    handler_errors: Arc<AtomicU64>,
}

impl Dispatcher {
    /// Start `workers` handler threads behind a queue of `capacity` messages
    ///
    /// Without a handler no threads are started and delivered messages are
    /// dropped after a debug log line.
    pub fn new(
        handler: Option<Arc<dyn MessageHandler>>,
        workers: usize,
        capacity: usize,
        debug: bool,
    ) -> Result<Self> {
        let delivered = Arc::new(AtomicU64::new(0));
        let handler_errors = Arc::new(AtomicU64::new(0));

        let Some(handler) = handler else {
            return Ok(Self {
                sender: Mutex::new(None),
                workers: Mutex::new(Vec::new()),
                has_handler: false,
                delivered,
                handler_errors,
            });
        };

        let (sender, receiver) = bounded(capacity.max(1));
        let handles = (0..workers.max(1))
            .map(|index| {
                spawn_worker(
                    index,
                    receiver.clone(),
                    Arc::clone(&handler),
                    Arc::clone(&delivered),
                    Arc::clone(&handler_errors),
                    debug,
                )
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            has_handler: true,
            delivered,
            handler_errors,
        })
    }

    /// Queue a message for the handler
    ///
    /// Waits (without blocking the runtime) while the queue is full.
    /// Fails with [`HubError::Shutdown`] once the dispatcher is closed.
    pub async fn deliver(&self, message: Message) -> Result<()> {
        if !self.has_handler {
            debug!(
                "No handler registered, dropping message on topic '{}'",
                message.topic()
            );
            return Ok(());
        }

        let sender = self.sender.lock().clone().ok_or(HubError::Shutdown)?;

        match sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                trace!("Dispatch queue full, waiting for a worker");
                tokio::task::spawn_blocking(move || sender.send(message))
                    .await
                    .map_err(|e| HubError::ChannelSend(e.to_string()))?
                    .map_err(|_| HubError::Shutdown)
            }
            Err(TrySendError::Disconnected(_)) => Err(HubError::Shutdown),
        }
    }

    /// Messages waiting in the queue
    pub fn queued(&self) -> usize {
        self.sender.lock().as_ref().map_or(0, |s| s.len())
    }

    /// Messages the handler has finished with (including failed ones)
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn handler_errors(&self) -> u64 {
        self.handler_errors.load(Ordering::Relaxed)
    }

    /// Stop accepting messages; workers drain what is already queued
    pub fn close(&self) {
        if self.sender.lock().take().is_some() {
            debug!("Dispatch queue closed");
        }
    }

    /// Close the queue and wait for every worker to finish
    ///
    /// Blocks the calling thread; call it from a blocking context.
    pub fn join(&self) {
        self.close();
        let handles = std::mem::take(&mut *self.workers.lock());
        debug!("Waiting for {} dispatch workers", handles.len());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

fn spawn_worker(
    index: usize,
    receiver: Receiver<Message>,
    handler: Arc<dyn MessageHandler>,
    delivered: Arc<AtomicU64>,
    handler_errors: Arc<AtomicU64>,
    debug: bool,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("hub-dispatch-{}", index))
        .spawn(move || {
            // Ends once the queue is closed and drained.
            for message in receiver.iter() {
                let topic = message.topic().to_string();
                if let Err(e) = handler.handle(message) {
                    handler_errors.fetch_add(1, Ordering::Relaxed);
                    report!(debug, "Handler error on topic '{}': {}", topic, e);
                }
                delivered.fetch_add(1, Ordering::Relaxed);
            }
            debug!("Dispatch worker {} exiting", index);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_all_messages_reach_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler: Arc<dyn MessageHandler> = {
            let count = Arc::clone(&count);
            Arc::new(move |_message: Message| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        let dispatcher = Dispatcher::new(Some(handler), 3, 8, false).unwrap();
        for i in 0..100 {
            dispatcher
                .deliver(Message::new("id", "t", format!("x.{}", i)))
                .await
                .unwrap();
        }

        tokio::task::block_in_place(|| dispatcher.join());
        assert_eq!(count.load(Ordering::SeqCst), 100);
        assert_eq!(dispatcher.delivered(), 100);
    }

    #[tokio::test]
    async fn test_full_queue_applies_backpressure() {
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        let handler: Arc<dyn MessageHandler> = Arc::new(move |_message: Message| {
            let _ = release_rx.recv_timeout(Duration::from_secs(5));
        });

        let dispatcher = Arc::new(Dispatcher::new(Some(handler), 1, 1, false).unwrap());
        // One message in the worker, one in the queue.
        dispatcher.deliver(Message::new("id", "t", "a.1")).await.unwrap();
        dispatcher.deliver(Message::new("id", "t", "a.2")).await.unwrap();

        let blocked = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.deliver(Message::new("id", "t", "a.3")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        for _ in 0..3 {
            release_tx.send(()).unwrap();
        }
        blocked.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_handler_errors_do_not_stop_workers() {
        struct Failing;
        impl MessageHandler for Failing {
            fn handle(&self, _message: Message) -> Result<()> {
                Err(HubError::Handler("boom".into()))
            }
        }

        let dispatcher = Dispatcher::new(Some(Arc::new(Failing)), 2, 4, true).unwrap();
        for _ in 0..5 {
            dispatcher.deliver(Message::new("id", "t", "a.b")).await.unwrap();
        }
        tokio::task::block_in_place(|| dispatcher.join());
        assert_eq!(dispatcher.handler_errors(), 5);
    }

    #[tokio::test]
    async fn test_no_handler_drops_silently() {
        let dispatcher = Dispatcher::new(None, 4, 4, false).unwrap();
        dispatcher.deliver(Message::new("id", "t", "a.b")).await.unwrap();
        assert_eq!(dispatcher.queued(), 0);
    }

    #[tokio::test]
    async fn test_deliver_after_close_fails() {
        let handler: Arc<dyn MessageHandler> = Arc::new(|_message: Message| {});
        let dispatcher = Dispatcher::new(Some(handler), 1, 1, false).unwrap();
        dispatcher.close();
        assert!(matches!(
            dispatcher.deliver(Message::new("id", "t", "a.b")).await,
            Err(HubError::Shutdown)
        ));
    }
}
