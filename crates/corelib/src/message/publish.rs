//! Request to publish one version of a dataset.

use uuid::Uuid;

use super::{MessageKind, Payload};
use crate::error::Result;
use crate::proc_ref::ProcRef;
use crate::wire::{FieldReader, FieldWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub name: String,
    pub description: String,
    pub dataset_id: Uuid,
    pub version: i32,
    /// Definition of the pipeline that produces the dataset. Opaque here.
    pub definition: String,
}

impl Publish {
    /// Reference to the dataset version being published.
    pub fn proc_ref(&self) -> ProcRef {
        ProcRef::new(self.dataset_id, self.version)
    }
}

impl Payload for Publish {
    const KIND: MessageKind = MessageKind::Publish;

    fn encode_payload(&self, writer: &mut FieldWriter) {
        writer.put_text(&self.name);
        writer.put_text(&self.description);
        writer.put_uuid(&self.dataset_id);
        writer.put_i32(self.version);
        writer.put_text(&self.definition);
    }

    fn decode_payload(reader: &mut FieldReader) -> Result<Self> {
        Ok(Self {
            name: reader.read_text("Publish.name")?,
            description: reader.read_text("Publish.description")?,
            dataset_id: reader.read_uuid("Publish.dataset_id")?,
            version: reader.read_i32("Publish.version")?,
            definition: reader.read_text("Publish.definition")?,
        })
    }
}
