//! The closed set of message kinds carried by the envelope.
//!
//! Every kind is identified on the wire by a fixed 4-byte tag that follows
//! the envelope fields. Decoding selects the variant decoder from the tag
//! alone, before any payload byte is read, with an exhaustive `match`: the
//! set is fixed at compile time, so there is no runtime registry.

pub mod data_sources;
pub mod noop;
pub mod progress;
pub mod publish;
pub mod request_config;

pub use data_sources::{DataSources, PublishedItem, RequestMode, RequestOptions};
pub use noop::NoOp;
pub use progress::Progress;
pub use publish::Publish;
pub use request_config::RequestConfig;

use crate::error::{Result, WireError};
use crate::wire::{FieldReader, FieldWriter};

/// Width of a type tag on the wire.
pub const TAG_LEN: usize = 4;

/// Message kind, one per variant of [`Message`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    NoOp,
    RequestConfig,
    Publish,
    Progress,
    DataSources,
}

impl MessageKind {
    /// Every known kind, in tag order.
    pub const ALL: [MessageKind; 5] = [
        MessageKind::NoOp,
        MessageKind::RequestConfig,
        MessageKind::Publish,
        MessageKind::Progress,
        MessageKind::DataSources,
    ];

    /// The stable wire tag.
    pub const fn tag(self) -> &'static [u8; TAG_LEN] {
        match self {
            MessageKind::NoOp => b"NoOp",
            MessageKind::RequestConfig => b"RCfg",
            MessageKind::Publish => b"Publ",
            MessageKind::Progress => b"Prog",
            MessageKind::DataSources => b"DSrc",
        }
    }

    /// Human-readable name, for diagnostics only.
    pub const fn name(self) -> &'static str {
        match self {
            MessageKind::NoOp => "No-op",
            MessageKind::RequestConfig => "Request configuration",
            MessageKind::Publish => "Publish",
            MessageKind::Progress => "Progress",
            MessageKind::DataSources => "Data sources",
        }
    }

    /// Look up the kind for a wire tag.
    ///
    /// # Errors
    ///
    /// [`WireError::UnknownMessageType`] if the tag is not in the closed set.
    pub fn from_tag(tag: &[u8]) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag().as_slice() == tag)
            .ok_or_else(|| WireError::UnknownMessageType {
                tag: String::from_utf8_lossy(tag).into_owned(),
            })
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload codec implemented by each concrete variant.
///
/// The envelope fields have already been written (or peeled off) when these
/// are called; implementations only deal with their own fields.
pub trait Payload: Sized {
    /// The kind this payload is sent as.
    const KIND: MessageKind;

    /// Append the variant fields.
    fn encode_payload(&self, writer: &mut FieldWriter);

    /// Read the variant fields back, in the order they were written.
    fn decode_payload(reader: &mut FieldReader) -> Result<Self>;
}

/// A decoded message of any known kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    NoOp(NoOp),
    RequestConfig(RequestConfig),
    Publish(Publish),
    Progress(Progress),
    DataSources(DataSources),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::NoOp(_) => NoOp::KIND,
            Message::RequestConfig(_) => RequestConfig::KIND,
            Message::Publish(_) => Publish::KIND,
            Message::Progress(_) => Progress::KIND,
            Message::DataSources(_) => DataSources::KIND,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Append the payload fields of whichever variant this is.
    pub fn encode_payload(&self, writer: &mut FieldWriter) {
        match self {
            Message::NoOp(m) => m.encode_payload(writer),
            Message::RequestConfig(m) => m.encode_payload(writer),
            Message::Publish(m) => m.encode_payload(writer),
            Message::Progress(m) => m.encode_payload(writer),
            Message::DataSources(m) => m.encode_payload(writer),
        }
    }

    /// Decode the payload for `kind` and require the reader to be drained.
    ///
    /// # Errors
    ///
    /// - [`WireError::MalformedMessage`] if a field is missing or invalid
    /// - [`WireError::TrailingData`] if bytes remain after the payload
    pub fn decode_payload(kind: MessageKind, reader: &mut FieldReader) -> Result<Self> {
        let message = match kind {
            MessageKind::NoOp => Message::NoOp(NoOp::decode_payload(reader)?),
            MessageKind::RequestConfig => {
                Message::RequestConfig(RequestConfig::decode_payload(reader)?)
            }
            MessageKind::Publish => Message::Publish(Publish::decode_payload(reader)?),
            MessageKind::Progress => Message::Progress(Progress::decode_payload(reader)?),
            MessageKind::DataSources => {
                Message::DataSources(DataSources::decode_payload(reader)?)
            }
        };
        reader.assert_at_end(kind.name())?;
        Ok(message)
    }
}

impl From<NoOp> for Message {
    fn from(m: NoOp) -> Self {
        Message::NoOp(m)
    }
}

impl From<RequestConfig> for Message {
    fn from(m: RequestConfig) -> Self {
        Message::RequestConfig(m)
    }
}

impl From<Publish> for Message {
    fn from(m: Publish) -> Self {
        Message::Publish(m)
    }
}

impl From<Progress> for Message {
    fn from(m: Progress) -> Self {
        Message::Progress(m)
    }
}

impl From<DataSources> for Message {
    fn from(m: DataSources) -> Self {
        Message::DataSources(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_unique_and_fixed_width() {
        let mut seen = std::collections::HashSet::new();
        for kind in MessageKind::ALL {
            assert_eq!(kind.tag().len(), TAG_LEN);
            assert!(seen.insert(kind.tag()), "duplicate tag for {kind}");
            assert_eq!(MessageKind::from_tag(kind.tag()).unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_tag() {
        let err = MessageKind::from_tag(b"Zzzz").unwrap_err();
        assert_eq!(
            err,
            WireError::UnknownMessageType {
                tag: "Zzzz".to_string()
            }
        );
    }

    #[test]
    fn test_kind_matches_variant() {
        let message: Message = NoOp::new("hi").into();
        assert_eq!(message.kind(), MessageKind::NoOp);
        assert_eq!(message.name(), "No-op");

        let message: Message = RequestConfig.into();
        assert_eq!(message.kind(), MessageKind::RequestConfig);

        let message: Message = Progress::new("r", "1%").into();
        assert_eq!(message.kind(), Progress::KIND);
        let message: Message = DataSources::default().into();
        assert_eq!(message.kind(), DataSources::KIND);
        assert_eq!(message.name(), "Data sources");
    }

    #[test]
    fn test_decode_rejects_extra_field() {
        let mut writer = FieldWriter::new();
        RequestConfig.encode_payload(&mut writer);
        writer.put_text("extra");
        let mut reader = FieldReader::new(writer.finish());
        let err = Message::decode_payload(MessageKind::RequestConfig, &mut reader).unwrap_err();
        assert!(matches!(err, WireError::TrailingData { remaining: 9, .. }));
    }
}
