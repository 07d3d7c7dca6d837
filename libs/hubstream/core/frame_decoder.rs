//! Newline-delimited stream splitter
//!
//! Socket reads do not line up with frames: one read may carry several
//! frames, and a frame may be split across reads. The decoder accumulates
//! bytes and hands out one complete line at a time.

use super::codec::TERMINATOR;

/// Largest frame accepted by default (terminator excluded)
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Output of [`FrameDecoder::next_frame`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFrame {
    /// One complete frame without its terminator
    Frame(Vec<u8>),
    /// A frame longer than the limit was dropped (total bytes discarded)
    Oversized(usize),
}

/// Accumulation buffer for the read loop
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Bytes at the front of `buffer` already known to hold no terminator
    scanned: usize,
    max_frame_len: usize,
    /// Bytes dropped so far from an oversized frame still in flight
    discarding: Option<usize>,
}

impl FrameDecoder {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_frame_len,
            discarding: None,
        }
    }

    /// Append freshly read bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes waiting for a terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Pop the next complete frame, if any
    ///
    /// Blank lines are skipped. Leading NUL bytes on a line are dropped, so
    /// peers that pad writes with zeroes still frame correctly.
    pub fn next_frame(&mut self) -> Option<DecodedFrame> {
        loop {
            let Some(offset) = self.buffer[self.scanned..]
                .iter()
                .position(|b| *b == TERMINATOR)
            else {
                self.scanned = self.buffer.len();
                if self.buffer.len() > self.max_frame_len {
                    let dropped = self.discarding.unwrap_or(0) + self.buffer.len();
                    self.discarding = Some(dropped);
                    self.buffer.clear();
                    self.scanned = 0;
                }
                return None;
            };

            let end = self.scanned + offset;
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            self.scanned = 0;
            line.pop();

            if let Some(dropped) = self.discarding.take() {
                return Some(DecodedFrame::Oversized(dropped + line.len() + 1));
            }

            let start = line.iter().position(|b| *b != 0).unwrap_or(line.len());
            if start > 0 {
                line.drain(..start);
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.is_empty() {
                continue;
            }
            if line.len() > self.max_frame_len {
                return Some(DecodedFrame::Oversized(line.len() + 1));
            }
            return Some(DecodedFrame::Frame(line));
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}
