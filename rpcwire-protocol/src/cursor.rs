//! Position-tracking reader and writer over frame buffers.

use crate::error::{Field, ProtocolError};
use crate::frame::{FIELD_SEPARATOR, PAIR_SEPARATOR};
use bytes::{BufMut, BytesMut};

/// Appends frame fields to a pre-sized buffer.
pub struct FrameWriter {
    buf: BytesMut,
}

impl FrameWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Writes a variable-length field followed by the field separator.
    pub fn put_field(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
        self.buf.put_u8(FIELD_SEPARATOR);
    }

    /// Writes one metadata entry: `key \r value \n`.
    pub fn put_meta_entry(&mut self, key: &[u8], value: &[u8]) {
        self.buf.put_slice(key);
        self.buf.put_u8(PAIR_SEPARATOR);
        self.put_field(value);
    }

    pub fn finish(self) -> BytesMut {
        self.buf
    }
}

/// Reads frame fields from a borrowed slice, never indexing past its end.
pub struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consumes exactly `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < len {
            return Err(ProtocolError::Truncated {
                needed: self.pos.saturating_add(len),
                available: self.buf.len(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    /// Consumes bytes up to and including the next `separator`, returning the
    /// bytes before it. Returns `None` without moving when it is absent.
    pub fn read_until(&mut self, separator: u8) -> Option<&'a [u8]> {
        let rest = &self.buf[self.pos..];
        let index = rest.iter().position(|&b| b == separator)?;
        self.pos += index + 1;
        Some(&rest[..index])
    }

    /// Like [`read_until`](Self::read_until) but reports a missing separator
    /// as a malformed `field`.
    pub fn read_field(&mut self, field: Field) -> Result<&'a [u8], ProtocolError> {
        self.read_until(FIELD_SEPARATOR)
            .ok_or(ProtocolError::MalformedHeader {
                field,
                reason: "is missing its field separator",
            })
    }

    /// Consumes everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }
}
