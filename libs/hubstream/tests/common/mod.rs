//! Common test utilities for hubstream integration tests
//!
//! In-memory connectors and streams standing in for the hub, plus a few
//! polling helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use hubstream::{BoxedStream, Connector, HubError, Message, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Outcome of one scripted connect attempt
pub enum Attempt {
    /// Handshake fails
    Fail,
    /// Handshake succeeds; the test holds the hub side of the pipe
    Stream(DuplexStream),
    /// Handshake succeeds; the first read fails
    ReadError,
    /// Handshake succeeds; writes are recorded
    Recording(RecordingStream),
}

/// What the connector does once the script runs out
#[derive(Clone, Copy)]
pub enum WhenExhausted {
    /// Never complete the handshake
    Hang,
    /// Fail every handshake
    Fail,
}

/// Connector replaying a fixed script of connect attempts
#[derive(Clone)]
pub struct MockConnector {
    script: Arc<Mutex<VecDeque<Attempt>>>,
    connects: Arc<AtomicUsize>,
    exhausted: WhenExhausted,
}

impl MockConnector {
    pub fn new(script: Vec<Attempt>, exhausted: WhenExhausted) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            connects: Arc::new(AtomicUsize::new(0)),
            exhausted,
        }
    }

    /// Every handshake fails
    pub fn failing() -> Self {
        Self::new(Vec::new(), WhenExhausted::Fail)
    }

    /// Handshakes attempted so far
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<BoxedStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();

        match next {
            Some(Attempt::Stream(stream)) => Ok(Box::new(stream)),
            Some(Attempt::ReadError) => Ok(Box::new(FailingStream)),
            Some(Attempt::Recording(stream)) => Ok(Box::new(stream)),
            Some(Attempt::Fail) => Err(HubError::Tls("scripted handshake failure".into())),
            None => match self.exhausted {
                WhenExhausted::Fail => Err(HubError::Connect("hub unreachable".into())),
                WhenExhausted::Hang => std::future::pending().await,
            },
        }
    }

    fn address(&self) -> &str {
        "mock-hub:7070"
    }
}

/// Stream whose reads fail with a connection reset
pub struct FailingStream;

impl AsyncRead for FailingStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")))
    }
}

impl AsyncWrite for FailingStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// One recorded `poll_write` call
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub bytes: Vec<u8>,
    pub after_close: bool,
}

/// Write-only stream that records every write and the shutdown
#[derive(Clone, Default)]
pub struct RecordingStream {
    writes: Arc<Mutex<Vec<RecordedWrite>>>,
    flushes: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl RecordingStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().clone()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl AsyncRead for RecordingStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        // EOF
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for RecordingStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.writes.lock().push(RecordedWrite {
            bytes: buf.to_vec(),
            after_close: self.closed.load(Ordering::SeqCst),
        });
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.closed.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Handler that records every message, optionally taking its time
#[derive(Clone, Default)]
pub struct CollectingHandler {
    messages: Arc<Mutex<Vec<Message>>>,
    delay: Duration,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }
}

impl hubstream::MessageHandler for CollectingHandler {
    fn handle(&self, message: Message) -> Result<()> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.messages.lock().push(message);
        Ok(())
    }
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
