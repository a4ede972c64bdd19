//! Append side of the field stream.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::node::NodeId;

/// Appends typed fields to a growing frame.
///
/// Numbers are little-endian, text and blobs carry an `i32` length prefix,
/// uuids and node ids are 16 raw bytes.
#[derive(Debug, Default)]
pub struct FieldWriter {
    buf: BytesMut,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append bytes with no length prefix. The reader must know the size.
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// One byte: 1 for true, 0 for false.
    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    /// Length-prefixed UTF-8 text.
    pub fn put_text(&mut self, value: &str) {
        self.put_blob(value.as_bytes());
    }

    /// Length-prefixed binary blob.
    ///
    /// # Panics
    ///
    /// Panics if the blob is longer than `i32::MAX` bytes, which the wire
    /// format cannot express.
    pub fn put_blob(&mut self, value: &[u8]) {
        let len = i32::try_from(value.len()).expect("field longer than i32::MAX bytes");
        self.buf.put_i32_le(len);
        self.buf.put_slice(value);
    }

    /// Element count of a following list.
    pub fn put_count(&mut self, count: usize) {
        let count = i32::try_from(count).expect("list longer than i32::MAX entries");
        self.buf.put_i32_le(count);
    }

    pub fn put_uuid(&mut self, value: &Uuid) {
        self.buf.put_slice(value.as_bytes());
    }

    pub fn put_node(&mut self, value: NodeId) {
        self.buf.put_slice(&value.to_le_bytes());
    }

    /// Freeze into an immutable frame.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}
