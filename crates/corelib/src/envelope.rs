//! Envelope: the fixed leading fields shared by every message.
//!
//! Frame layout:
//!
//! ```text
//! destination:node(16) source:node(16) correlation_id:text tag:raw(4) payload...
//! ```
//!
//! Decoding peels the envelope off the head of the frame, picks the payload
//! decoder from the tag, then requires the payload to use up the rest of the
//! frame exactly.

use bytes::Bytes;

use crate::error::{Result, WireError};
use crate::message::{Message, MessageKind, TAG_LEN};
use crate::node::NodeId;
use crate::wire::{FieldReader, FieldWriter};

/// Smallest possible frame: two node ids, an empty correlation id, a tag.
pub const MIN_FRAME_LEN: usize = NodeId::WIRE_LEN * 2 + 4 + TAG_LEN;

/// Addressing and correlation fields of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Envelope {
    pub destination: NodeId,
    pub source: NodeId,
    /// Caller-chosen token matching a reply to its request.
    pub correlation_id: String,
}

impl Envelope {
    pub fn new(destination: NodeId, source: NodeId, correlation_id: impl Into<String>) -> Self {
        Self {
            destination,
            source,
            correlation_id: correlation_id.into(),
        }
    }

    /// Swap source and destination in place so a reply goes back to the
    /// node that sent the request. The correlation id is kept.
    pub fn prepare_for_return_trip(&mut self) {
        std::mem::swap(&mut self.source, &mut self.destination);
    }

    /// Copy of this envelope addressed back to its sender.
    pub fn return_trip(&self) -> Self {
        let mut reply = self.clone();
        reply.prepare_for_return_trip();
        reply
    }
}

/// Envelope fields read off a frame, plus the reader positioned at the
/// first payload byte.
#[derive(Debug, Clone)]
pub struct Header {
    pub envelope: Envelope,
    /// Raw tag; not yet checked against the known kinds.
    pub tag: [u8; TAG_LEN],
    pub payload: FieldReader,
}

impl Header {
    /// Peel the envelope fields off `frame`.
    ///
    /// # Errors
    ///
    /// [`WireError::MalformedMessage`] if the frame is shorter than the
    /// envelope.
    pub fn read(frame: Bytes) -> Result<Self> {
        if frame.len() < MIN_FRAME_LEN {
            return Err(WireError::malformed(format!(
                "envelope: frame of {} bytes is shorter than {MIN_FRAME_LEN}",
                frame.len()
            )));
        }
        let mut reader = FieldReader::new(frame);
        let destination = reader.read_node("envelope.destination")?;
        let source = reader.read_node("envelope.source")?;
        let correlation_id = reader.read_text("envelope.correlation_id")?;
        let raw = reader.read_raw(TAG_LEN, "envelope.tag")?;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&raw);

        Ok(Self {
            envelope: Envelope {
                destination,
                source,
                correlation_id,
            },
            tag,
            payload: reader,
        })
    }

    /// Resolve the tag against the closed set of kinds.
    pub fn kind(&self) -> Result<MessageKind> {
        MessageKind::from_tag(&self.tag)
    }
}

/// An envelope together with its decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub envelope: Envelope,
    pub message: Message,
}

impl Packet {
    pub fn new(envelope: Envelope, message: impl Into<Message>) -> Self {
        Self {
            envelope,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }

    pub fn correlation_id(&self) -> &str {
        &self.envelope.correlation_id
    }

    /// Serialize to a frame.
    pub fn encode(&self) -> Bytes {
        encode(&self.envelope, &self.message)
    }

    /// Parse a complete frame.
    pub fn decode(frame: Bytes) -> Result<Self> {
        decode(frame)
    }
}

/// Serialize an envelope and message into one frame.
pub fn encode(envelope: &Envelope, message: &Message) -> Bytes {
    let mut writer =
        FieldWriter::with_capacity(MIN_FRAME_LEN + envelope.correlation_id.len() + 64);
    writer.put_node(envelope.destination);
    writer.put_node(envelope.source);
    writer.put_text(&envelope.correlation_id);
    writer.put_raw(message.kind().tag());
    message.encode_payload(&mut writer);
    writer.finish()
}

/// Parse a complete frame.
///
/// # Errors
///
/// - [`WireError::MalformedMessage`] if the envelope or payload is truncated
/// - [`WireError::UnknownMessageType`] if the tag is not a known kind
/// - [`WireError::TrailingData`] if bytes remain after the payload
pub fn decode(frame: Bytes) -> Result<Packet> {
    let mut header = Header::read(frame)?;
    let kind = header.kind()?;
    let message = Message::decode_payload(kind, &mut header.payload)?;
    Ok(Packet {
        envelope: header.envelope,
        message,
    })
}
