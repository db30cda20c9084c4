//! Fixed frame prefix shared by request and response frames.
//!
//! Every frame starts with a 15-byte prefix followed by the rest of the
//! header and then the body:
//!
//! ```text
//! +-------------+-------------+------------+---------+------------+------------+
//! | head_length | body_length | message_id | version | compressor | serializer |
//! |   4 bytes   |   4 bytes   |  4 bytes   | 1 byte  |   1 byte   |   1 byte   |
//! +-------------+-------------+------------+---------+------------+------------+
//! | header remainder (head_length - 15 bytes) | body (body_length bytes)       |
//! +-------------------------------------------+--------------------------------+
//! ```
//!
//! All integers are big-endian.

use crate::cursor::{FrameReader, FrameWriter};
use crate::error::{Field, ProtocolError};

/// Size of the fixed frame prefix in bytes (4+4+4+1+1+1 = 15).
pub const FRAME_PREFIX_SIZE: usize = 15;

/// Terminates each variable-length header field.
pub const FIELD_SEPARATOR: u8 = b'\n';

/// Splits a metadata entry into key and value.
pub const PAIR_SEPARATOR: u8 = b'\r';

/// Default upper bound for a whole frame (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Converts an in-memory length to its wire field.
///
/// Lengths that do not fit in `u32` become `u32::MAX`, which never matches
/// the content it was taken from, so the encoder rejects the frame.
pub(crate) fn wire_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Serde helpers for opaque payloads, written as lowercase hex strings.
pub(crate) mod hex_bytes {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map(Bytes::from).map_err(serde::de::Error::custom)
    }
}

/// The fixed leading fields of a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePrefix {
    pub head_length: u32,
    pub body_length: u32,
    pub message_id: u32,
    pub version: u8,
    pub compressor: u8,
    pub serializer: u8,
}

impl FramePrefix {
    /// Parses the prefix from the start of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = FrameReader::new(buf);
        Self::read(&mut reader)
    }

    pub(crate) fn read(reader: &mut FrameReader<'_>) -> Result<Self, ProtocolError> {
        let prefix = Self {
            head_length: reader.read_u32()?,
            body_length: reader.read_u32()?,
            message_id: reader.read_u32()?,
            version: reader.read_u8()?,
            compressor: reader.read_u8()?,
            serializer: reader.read_u8()?,
        };

        if (prefix.head_length as usize) < FRAME_PREFIX_SIZE {
            return Err(ProtocolError::InconsistentLength {
                field: Field::HeadLength,
                declared: prefix.head_length as usize,
                actual: FRAME_PREFIX_SIZE,
            });
        }

        Ok(prefix)
    }

    pub(crate) fn write(&self, writer: &mut FrameWriter) {
        writer.put_u32(self.head_length);
        writer.put_u32(self.body_length);
        writer.put_u32(self.message_id);
        writer.put_u8(self.version);
        writer.put_u8(self.compressor);
        writer.put_u8(self.serializer);
    }

    /// Total frame size declared by the prefix.
    pub fn frame_len(&self) -> usize {
        (self.head_length as usize).saturating_add(self.body_length as usize)
    }

    /// Rejects frames whose declared size exceeds `max`.
    pub fn check_size(&self, max: usize) -> Result<(), ProtocolError> {
        let size = self.frame_len();
        if size > max {
            return Err(ProtocolError::FrameTooLarge { size, max });
        }
        Ok(())
    }

    /// Ensures `available` bytes hold exactly the declared frame.
    pub fn check_bounds(&self, available: usize) -> Result<(), ProtocolError> {
        let frame_len = self.frame_len();
        if available < frame_len {
            return Err(ProtocolError::Truncated {
                needed: frame_len,
                available,
            });
        }
        if available > frame_len {
            return Err(ProtocolError::InconsistentLength {
                field: Field::BodyLength,
                declared: self.body_length as usize,
                actual: available - self.head_length as usize,
            });
        }
        Ok(())
    }
}

/// Returns the length of the frame at the start of `buf`.
///
/// Returns `Ok(None)` if fewer than [`FRAME_PREFIX_SIZE`] bytes are available.
/// The returned length may exceed `buf.len()`; the caller reads until it has
/// that many bytes.
pub fn peek_frame_len(buf: &[u8], max_frame_size: usize) -> Result<Option<usize>, ProtocolError> {
    if buf.len() < FRAME_PREFIX_SIZE {
        return Ok(None);
    }
    let prefix = FramePrefix::parse(buf)?;
    prefix.check_size(max_frame_size)?;
    Ok(Some(prefix.frame_len()))
}
