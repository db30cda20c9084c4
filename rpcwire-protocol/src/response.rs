//! RPC result frames.
//!
//! The response header is the fixed prefix followed by the raw error bytes,
//! so `head_length` is always `15 + error.len()`. There are no separators.

use crate::config::CodecConfig;
use crate::cursor::{FrameReader, FrameWriter};
use crate::error::{Field, ProtocolError};
use crate::frame::{wire_len, FramePrefix, FRAME_PREFIX_SIZE};
use crate::request::Request;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// One RPC result frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Response {
    pub head_length: u32,
    pub body_length: u32,
    pub message_id: u32,
    pub version: u8,
    pub compressor: u8,
    pub serializer: u8,
    /// Serialized failure information; empty on success.
    #[serde(with = "crate::frame::hex_bytes")]
    pub error: Bytes,
    #[serde(with = "crate::frame::hex_bytes")]
    pub data: Bytes,
}

impl Response {
    pub fn new(message_id: u32) -> Self {
        let mut response = Self {
            message_id,
            ..Default::default()
        };
        response.compute_head_length();
        response
    }

    /// Creates a reply carrying the request's message id and protocol codes.
    pub fn for_request(request: &Request) -> Self {
        Self::new(request.message_id).with_codes(
            request.version,
            request.compressor,
            request.serializer,
        )
    }

    pub fn with_codes(mut self, version: u8, compressor: u8, serializer: u8) -> Self {
        self.version = version;
        self.compressor = compressor;
        self.serializer = serializer;
        self
    }

    pub fn with_error(mut self, error: impl Into<Bytes>) -> Self {
        self.error = error.into();
        self.compute_head_length();
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self.body_length = wire_len(self.data.len());
        self
    }

    /// Returns whether the call failed.
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    pub fn expected_head_length(&self) -> usize {
        FRAME_PREFIX_SIZE + self.error.len()
    }

    /// Stores `15 + error.len()` as the header length and returns it.
    pub fn compute_head_length(&mut self) -> u32 {
        self.head_length = wire_len(self.expected_head_length());
        self.head_length
    }

    pub fn prefix(&self) -> FramePrefix {
        FramePrefix {
            head_length: self.head_length,
            body_length: self.body_length,
            message_id: self.message_id,
            version: self.version,
            compressor: self.compressor,
            serializer: self.serializer,
        }
    }

    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        self.encode_with(&CodecConfig::default())
    }

    pub fn encode_with(&self, config: &CodecConfig) -> Result<BytesMut, ProtocolError> {
        if self.head_length as usize != self.expected_head_length() {
            return Err(ProtocolError::InconsistentLength {
                field: Field::HeadLength,
                declared: self.head_length as usize,
                actual: self.expected_head_length(),
            });
        }
        if self.body_length as usize != self.data.len() {
            return Err(ProtocolError::InconsistentLength {
                field: Field::BodyLength,
                declared: self.body_length as usize,
                actual: self.data.len(),
            });
        }

        let prefix = self.prefix();
        prefix.check_size(config.max_frame_size)?;

        let mut writer = FrameWriter::with_capacity(prefix.frame_len());
        prefix.write(&mut writer);
        writer.put_slice(&self.error);
        writer.put_slice(&self.data);
        Ok(writer.finish())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        Self::decode_with(buf, &CodecConfig::default())
    }

    /// Decodes exactly one response frame.
    pub fn decode_with(buf: &[u8], config: &CodecConfig) -> Result<Self, ProtocolError> {
        let mut reader = FrameReader::new(buf);
        let prefix = FramePrefix::read(&mut reader)?;
        prefix.check_size(config.max_frame_size)?;
        prefix.check_bounds(buf.len())?;

        let error = reader.take(prefix.head_length as usize - FRAME_PREFIX_SIZE)?;
        let data = reader.take(prefix.body_length as usize)?;

        Ok(Self {
            head_length: prefix.head_length,
            body_length: prefix.body_length,
            message_id: prefix.message_id,
            version: prefix.version,
            compressor: prefix.compressor,
            serializer: prefix.serializer,
            error: Bytes::copy_from_slice(error),
            data: Bytes::copy_from_slice(data),
        })
    }
}
