//! Frame codec
//!
//! Dotted wire format, one frame per line:
//!
//! ```text
//! <subscriber_id>.<topic>.<payload>\n
//! ```
//!
//! Payloads are expected to carry exactly one dot of their own
//! (`<action>.<object_id>`), so a well-formed inbound frame splits into four
//! parts. The format cannot carry a `.` inside the subscriber id or topic and
//! rejects any payload with a different number of dots; [`escaped`] lifts
//! that restriction for hubs that speak it.

use crate::error::{HubError, Result};
use crate::parser::{DottedParser, EscapedParser, FrameParser, Message};
use std::sync::Arc;

/// Field separator
pub const DELIMITER: u8 = b'.';

/// Frame terminator
pub const TERMINATOR: u8 = b'\n';

/// Number of dot-separated parts in a well-formed dotted frame
pub const FRAME_PARTS: usize = 4;

/// Encode a dotted frame, terminator included
pub fn encode(subscriber_id: &str, topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(subscriber_id.len() + topic.len() + payload.len() + 3);
    frame.extend_from_slice(subscriber_id.as_bytes());
    frame.push(DELIMITER);
    frame.extend_from_slice(topic.as_bytes());
    frame.push(DELIMITER);
    frame.extend_from_slice(payload);
    frame.push(TERMINATOR);
    frame
}

/// Encode a message as a dotted frame
pub fn encode_message(message: &Message) -> Vec<u8> {
    encode(message.subscriber_id(), message.topic(), message.payload())
}

/// Decode a dotted frame
///
/// Trailing NUL padding and a trailing `\n` / `\r\n` are ignored. Returns
/// `None` unless the frame splits into exactly [`FRAME_PARTS`] parts with a
/// non-empty UTF-8 subscriber id and topic.
pub fn decode(raw: &[u8]) -> Option<Message> {
    let frame = trim_frame(raw);
    let parts: Vec<&[u8]> = frame.split(|b| *b == DELIMITER).collect();
    if parts.len() != FRAME_PARTS {
        return None;
    }

    let subscriber_id = non_empty_utf8(parts[0])?;
    let topic = non_empty_utf8(parts[1])?;

    let mut payload = Vec::with_capacity(parts[2].len() + 1 + parts[3].len());
    payload.extend_from_slice(parts[2]);
    payload.push(DELIMITER);
    payload.extend_from_slice(parts[3]);

    Some(Message::new(subscriber_id, topic, payload))
}

fn trim_frame(raw: &[u8]) -> &[u8] {
    let mut end = raw.len();
    while end > 0 && raw[end - 1] == 0 {
        end -= 1;
    }
    if end > 0 && raw[end - 1] == TERMINATOR {
        end -= 1;
        if end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }
    }
    &raw[..end]
}

fn non_empty_utf8(bytes: &[u8]) -> Option<&str> {
    match std::str::from_utf8(bytes) {
        Ok(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Escaped three-field framing
///
/// Same shape as the dotted format, but `\`, `.`, newline, carriage return
/// and NUL inside a field are written as `\\`, `\.`, `\n`, `\r` and `\0`.
/// None of the bytes the stream decoder trims ever appear raw, so any field
/// contents round-trip and a frame always splits into exactly three fields.
pub mod escaped {
    use super::{non_empty_utf8, DELIMITER, TERMINATOR};
    use crate::parser::Message;

    const ESCAPE: u8 = b'\\';

    pub fn encode(subscriber_id: &str, topic: &str, payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(subscriber_id.len() + topic.len() + payload.len() + 8);
        push_escaped(&mut frame, subscriber_id.as_bytes());
        frame.push(DELIMITER);
        push_escaped(&mut frame, topic.as_bytes());
        frame.push(DELIMITER);
        push_escaped(&mut frame, payload);
        frame.push(TERMINATOR);
        frame
    }

    pub fn decode(raw: &[u8]) -> Option<Message> {
        let frame = raw.strip_suffix(&[TERMINATOR]).unwrap_or(raw);

        let mut fields: Vec<Vec<u8>> = Vec::with_capacity(3);
        let mut current = Vec::with_capacity(frame.len());
        let mut bytes = frame.iter().copied();

        while let Some(byte) = bytes.next() {
            match byte {
                ESCAPE => match bytes.next()? {
                    ESCAPE => current.push(ESCAPE),
                    DELIMITER => current.push(DELIMITER),
                    b'n' => current.push(TERMINATOR),
                    b'r' => current.push(b'\r'),
                    b'0' => current.push(0),
                    _ => return None,
                },
                DELIMITER => fields.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
        fields.push(current);

        if fields.len() != 3 {
            return None;
        }
        let payload = fields.pop()?;
        let topic = non_empty_utf8(&fields[1])?.to_string();
        let subscriber_id = non_empty_utf8(&fields[0])?.to_string();

        Some(Message::new(subscriber_id, topic, payload))
    }

    fn push_escaped(out: &mut Vec<u8>, field: &[u8]) {
        for &byte in field {
            match byte {
                ESCAPE => out.extend_from_slice(b"\\\\"),
                DELIMITER => out.extend_from_slice(b"\\."),
                TERMINATOR => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                0 => out.extend_from_slice(b"\\0"),
                other => out.push(other),
            }
        }
    }
}

/// Wire format spoken with the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// `<id>.<topic>.<payload>\n`, four-part decode
    #[default]
    Dotted,
    /// Escaped three-field frames
    Escaped,
}

impl WireFormat {
    pub fn encode(&self, subscriber_id: &str, topic: &str, payload: &[u8]) -> Vec<u8> {
        match self {
            WireFormat::Dotted => encode(subscriber_id, topic, payload),
            WireFormat::Escaped => escaped::encode(subscriber_id, topic, payload),
        }
    }

    /// Parser used when the caller does not configure one
    pub fn default_parser(&self) -> Arc<dyn FrameParser> {
        match self {
            WireFormat::Dotted => Arc::new(DottedParser),
            WireFormat::Escaped => Arc::new(EscapedParser),
        }
    }

    /// Check that a topic can be carried in this format
    pub fn validate_topic(&self, topic: &str) -> Result<()> {
        if self.field_is_valid(topic) {
            Ok(())
        } else {
            Err(HubError::InvalidTopic(topic.to_string()))
        }
    }

    /// Check that a subscriber id can be carried in this format
    pub fn validate_subscriber_id(&self, subscriber_id: &str) -> Result<()> {
        if self.field_is_valid(subscriber_id) {
            Ok(())
        } else {
            Err(HubError::Configuration(format!(
                "subscriber id {:?} is empty or contains a frame delimiter",
                subscriber_id
            )))
        }
    }

    /// Check that a payload survives the trip as a single frame
    ///
    /// A dotted payload may not contain a newline (it would end the frame
    /// early and start a second one) nor end in `\r`, which the stream
    /// decoder strips.
    pub fn validate_payload(&self, payload: &[u8]) -> Result<()> {
        match self {
            WireFormat::Dotted if payload.contains(&TERMINATOR) => Err(HubError::InvalidPayload(
                "newline inside a dotted payload".to_string(),
            )),
            WireFormat::Dotted if payload.last() == Some(&b'\r') => Err(HubError::InvalidPayload(
                "dotted payload ends in a carriage return".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn field_is_valid(&self, field: &str) -> bool {
        if field.is_empty() {
            return false;
        }
        match self {
            WireFormat::Dotted => !field.bytes().any(|b| b == DELIMITER || b == TERMINATOR),
            WireFormat::Escaped => true,
        }
    }
}
