//! Extract side of the field stream.

use bytes::{Buf, Bytes};
use uuid::Uuid;

use crate::error::{Result, WireError};
use crate::node::NodeId;

/// Consumes typed fields from the head of a frame.
///
/// Every read is bounds-checked; running off the end yields
/// [`WireError::MalformedMessage`] naming the field being read. Cloning a
/// reader is cheap (the frame is reference counted).
#[derive(Debug, Clone)]
pub struct FieldReader {
    buf: Bytes,
}

impl FieldReader {
    pub fn new(frame: Bytes) -> Self {
        Self { buf: frame }
    }

    /// Unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// Fail with [`WireError::TrailingData`] unless every byte was consumed.
    pub fn assert_at_end(&self, kind: &'static str) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(WireError::TrailingData {
                kind,
                remaining: self.remaining(),
            })
        }
    }

    fn need(&self, n: usize, context: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(WireError::malformed(format!(
                "{context}: need {n} bytes, have {}",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    /// Read `n` bytes with no length prefix.
    pub fn read_raw(&mut self, n: usize, context: &str) -> Result<Bytes> {
        self.need(n, context)?;
        Ok(self.buf.split_to(n))
    }

    pub fn read_u8(&mut self, context: &str) -> Result<u8> {
        self.need(1, context)?;
        Ok(self.buf.get_u8())
    }

    /// One byte; only 1 reads as true.
    pub fn read_bool(&mut self, context: &str) -> Result<bool> {
        Ok(self.read_u8(context)? == 1)
    }

    pub fn read_u16(&mut self, context: &str) -> Result<u16> {
        self.need(2, context)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_i32(&mut self, context: &str) -> Result<i32> {
        self.need(4, context)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_u32(&mut self, context: &str) -> Result<u32> {
        self.need(4, context)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i64(&mut self, context: &str) -> Result<i64> {
        self.need(8, context)?;
        Ok(self.buf.get_i64_le())
    }

    /// Read an `i32` length and reject negative values.
    fn read_len(&mut self, context: &str) -> Result<usize> {
        let len = self.read_i32(context)?;
        usize::try_from(len)
            .map_err(|_| WireError::malformed(format!("{context}: negative length {len}")))
    }

    /// Length-prefixed binary blob.
    pub fn read_blob(&mut self, context: &str) -> Result<Bytes> {
        let len = self.read_len(context)?;
        self.read_raw(len, context)
    }

    /// Length-prefixed UTF-8 text.
    pub fn read_text(&mut self, context: &str) -> Result<String> {
        let bytes = self.read_blob(context)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| WireError::malformed(format!("{context}: invalid UTF-8")))
    }

    /// Element count of a following list.
    ///
    /// Each element takes at least `min_element_len` bytes, so counts that
    /// cannot possibly fit in the remaining frame are rejected up front.
    pub fn read_count(&mut self, min_element_len: usize, context: &str) -> Result<usize> {
        let count = self.read_len(context)?;
        if count.saturating_mul(min_element_len) > self.remaining() {
            return Err(WireError::malformed(format!(
                "{context}: {count} entries cannot fit in {} bytes",
                self.remaining()
            )));
        }
        Ok(count)
    }

    pub fn read_uuid(&mut self, context: &str) -> Result<Uuid> {
        self.need(16, context)?;
        let mut bytes = [0u8; 16];
        self.buf.copy_to_slice(&mut bytes);
        Ok(Uuid::from_bytes(bytes))
    }

    pub fn read_node(&mut self, context: &str) -> Result<NodeId> {
        self.need(NodeId::WIRE_LEN, context)?;
        let mut bytes = [0u8; 16];
        self.buf.copy_to_slice(&mut bytes);
        Ok(NodeId::from_le_bytes(bytes))
    }
}
