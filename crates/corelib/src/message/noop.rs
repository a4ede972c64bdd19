//! Diagnostic ping carrying a free-text note.

use super::{MessageKind, Payload};
use crate::error::Result;
use crate::wire::{FieldReader, FieldWriter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoOp {
    pub note: String,
}

impl NoOp {
    pub fn new(note: impl Into<String>) -> Self {
        Self { note: note.into() }
    }
}

impl Payload for NoOp {
    const KIND: MessageKind = MessageKind::NoOp;

    fn encode_payload(&self, writer: &mut FieldWriter) {
        writer.put_text(&self.note);
    }

    fn decode_payload(reader: &mut FieldReader) -> Result<Self> {
        let note = reader.read_text("NoOp.note")?;
        Ok(Self { note })
    }
}
