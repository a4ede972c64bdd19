//! Progress report for a long-running operation.

use super::{MessageKind, Payload};
use crate::error::Result;
use crate::wire::{FieldReader, FieldWriter};

/// Free-text progress for the item identified by `reference`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    /// What the progress is about (usually a proc ref).
    pub reference: String,
    pub progress_text: String,
}

impl Progress {
    pub fn new(reference: impl Into<String>, progress_text: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            progress_text: progress_text.into(),
        }
    }
}

impl Payload for Progress {
    const KIND: MessageKind = MessageKind::Progress;

    fn encode_payload(&self, writer: &mut FieldWriter) {
        writer.put_text(&self.reference);
        writer.put_text(&self.progress_text);
    }

    fn decode_payload(reader: &mut FieldReader) -> Result<Self> {
        Ok(Self {
            reference: reader.read_text("Progress.reference")?,
            progress_text: reader.read_text("Progress.progress_text")?,
        })
    }
}
