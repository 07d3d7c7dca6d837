use crate::core::codec;
use crate::error::{HubError, Result};

/// One pub/sub message as carried by a frame
///
/// Messages are built right before encoding or right after decoding and are
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    subscriber_id: String,
    topic: String,
    payload: Vec<u8>,
}

impl Message {
    pub fn new(
        subscriber_id: impl Into<String>,
        topic: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Originating or target client
    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as text, if it is valid UTF-8
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Split the message into (subscriber_id, topic, payload)
    pub fn into_parts(self) -> (String, String, Vec<u8>) {
        (self.subscriber_id, self.topic, self.payload)
    }
}

/// Trait for turning one inbound frame into a [`Message`]
///
/// The frame handed to the parser has already been split off the stream by
/// the frame decoder and no longer carries its `\n` terminator.
///
/// Any `Fn(&[u8]) -> Option<Message>` closure is a parser as well.
///
/// # Example
/// ```ignore
/// let client = hubstream::builder()
///     .address("hub.local:7070")
///     .subscriber_id("3456")
///     .parser(|frame: &[u8]| {
///         let text = std::str::from_utf8(frame).ok()?;
///         let (topic, body) = text.split_once(':')?;
///         Some(Message::new("hub", topic, body))
///     })
///     .build()
///     .await?;
/// ```
pub trait FrameParser: Send + Sync + 'static {
    /// Parse a single frame
    ///
    /// # Returns
    /// * `Ok(message)` - Frame parsed, message goes to the dispatcher
    /// * `Err(HubError::Parse)` - Frame dropped, read loop continues
    fn parse(&self, frame: &[u8]) -> Result<Message>;
}

/// Default parser for `<subscriber_id>.<topic>.<action>.<object>` frames
///
/// Expects exactly four dot-separated parts and rebuilds the payload from the
/// last two.
#[derive(Debug, Clone, Copy, Default)]
pub struct DottedParser;

impl FrameParser for DottedParser {
    fn parse(&self, frame: &[u8]) -> Result<Message> {
        codec::decode(frame).ok_or_else(|| {
            HubError::Parse(format!(
                "expected {} dot-separated parts in {} byte frame",
                codec::FRAME_PARTS,
                frame.len()
            ))
        })
    }
}

/// Parser for the escaped three-field framing
#[derive(Debug, Clone, Copy, Default)]
pub struct EscapedParser;

impl FrameParser for EscapedParser {
    fn parse(&self, frame: &[u8]) -> Result<Message> {
        codec::escaped::decode(frame).ok_or_else(|| {
            HubError::Parse(format!("malformed escaped frame ({} bytes)", frame.len()))
        })
    }
}

impl<F> FrameParser for F
where
    F: Fn(&[u8]) -> Option<Message> + Send + Sync + 'static,
{
    fn parse(&self, frame: &[u8]) -> Result<Message> {
        self(frame).ok_or_else(|| {
            HubError::Parse(format!("custom parser rejected {} byte frame", frame.len()))
        })
    }
}
