//! Configuration request. The payload is empty: receiving one is the request.

use super::{MessageKind, Payload};
use crate::error::Result;
use crate::wire::{FieldReader, FieldWriter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestConfig;

impl Payload for RequestConfig {
    const KIND: MessageKind = MessageKind::RequestConfig;

    fn encode_payload(&self, _writer: &mut FieldWriter) {}

    fn decode_payload(_reader: &mut FieldReader) -> Result<Self> {
        Ok(RequestConfig)
    }
}
