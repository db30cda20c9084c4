//! RPC call frames.
//!
//! A request header carries the service and method names and an unordered
//! set of metadata entries after the fixed prefix:
//!
//! ```text
//! prefix (15) | service \n | method \n | key \r value \n ... | data
//! ```

use crate::config::CodecConfig;
use crate::cursor::{FrameReader, FrameWriter};
use crate::error::{Field, ProtocolError};
use crate::frame::{wire_len, FramePrefix, FIELD_SEPARATOR, FRAME_PREFIX_SIZE, PAIR_SEPARATOR};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// One RPC call frame.
///
/// `head_length` and `body_length` are stored explicitly because they travel
/// on the wire. The builder methods keep them in sync; after mutating fields
/// directly call [`compute_head_length`](Self::compute_head_length) (and set
/// `body_length`) before encoding, since the encoder never recomputes them.
///
/// Serializes with metadata in key order and the payload as hex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    pub head_length: u32,
    pub body_length: u32,
    /// Correlates the request with its response.
    pub message_id: u32,
    pub version: u8,
    pub compressor: u8,
    pub serializer: u8,
    pub service_name: String,
    pub method_name: String,
    #[serde(serialize_with = "sorted_meta")]
    pub meta: HashMap<String, String>,
    #[serde(with = "crate::frame::hex_bytes")]
    pub data: Bytes,
}

impl Request {
    pub fn new(
        message_id: u32,
        service_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        let mut request = Self {
            message_id,
            service_name: service_name.into(),
            method_name: method_name.into(),
            ..Default::default()
        };
        request.compute_head_length();
        request
    }

    /// Sets the version, compressor and serializer codes.
    pub fn with_codes(mut self, version: u8, compressor: u8, serializer: u8) -> Self {
        self.version = version;
        self.compressor = compressor;
        self.serializer = serializer;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self.compute_head_length();
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self.body_length = wire_len(self.data.len());
        self
    }

    /// Header size implied by the current content.
    pub fn expected_head_length(&self) -> usize {
        let meta_len: usize = self
            .meta
            .iter()
            .map(|(key, value)| key.len() + 1 + value.len() + 1)
            .sum();
        FRAME_PREFIX_SIZE + self.service_name.len() + 1 + self.method_name.len() + 1 + meta_len
    }

    /// Stores the header size implied by the current content and returns it.
    ///
    /// A header that does not fit in `u32` is stored as `u32::MAX`, which the
    /// encoder then rejects.
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

    /// Checks that no name, key or value contains a reserved separator.
    pub fn validate_fields(&self) -> Result<(), ProtocolError> {
        check_reserved(Field::ServiceName, self.service_name.as_bytes())?;
        check_reserved(Field::MethodName, self.method_name.as_bytes())?;
        for (key, value) in &self.meta {
            check_reserved(Field::MetaKey, key.as_bytes())?;
            check_reserved(Field::MetaValue, value.as_bytes())?;
        }
        Ok(())
    }

    /// Encodes with the default configuration.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        self.encode_with(&CodecConfig::default())
    }

    /// Encodes the request into exactly `head_length + body_length` bytes.
    pub fn encode_with(&self, config: &CodecConfig) -> Result<BytesMut, ProtocolError> {
        if config.validate_fields {
            self.validate_fields()?;
        }

        let head_length = self.expected_head_length();
        if self.head_length as usize != head_length {
            return Err(ProtocolError::InconsistentLength {
                field: Field::HeadLength,
                declared: self.head_length as usize,
                actual: head_length,
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
        writer.put_field(self.service_name.as_bytes());
        writer.put_field(self.method_name.as_bytes());
        for (key, value) in &self.meta {
            writer.put_meta_entry(key.as_bytes(), value.as_bytes());
        }
        writer.put_slice(&self.data);

        debug_assert_eq!(writer.position(), prefix.frame_len());
        Ok(writer.finish())
    }

    /// Decodes with the default configuration.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        Self::decode_with(buf, &CodecConfig::default())
    }

    /// Decodes exactly one request frame.
    pub fn decode_with(buf: &[u8], config: &CodecConfig) -> Result<Self, ProtocolError> {
        let mut reader = FrameReader::new(buf);
        let prefix = FramePrefix::read(&mut reader)?;
        prefix.check_size(config.max_frame_size)?;
        prefix.check_bounds(buf.len())?;

        let header_rest = prefix.head_length as usize - FRAME_PREFIX_SIZE;
        let mut header = FrameReader::new(reader.take(header_rest)?);
        let service_name = utf8(header.read_field(Field::ServiceName)?, Field::ServiceName)?;
        let method_name = utf8(header.read_field(Field::MethodName)?, Field::MethodName)?;

        let mut meta = HashMap::new();
        while !header.is_empty() {
            let mut entry = FrameReader::new(header.read_field(Field::MetaEntry)?);
            let key = entry
                .read_until(PAIR_SEPARATOR)
                .ok_or(ProtocolError::MalformedHeader {
                    field: Field::MetaEntry,
                    reason: "is missing its pair separator",
                })?;
            let value = entry.rest();
            if value.contains(&PAIR_SEPARATOR) {
                return Err(ProtocolError::MalformedHeader {
                    field: Field::MetaValue,
                    reason: "contains a pair separator",
                });
            }
            meta.insert(utf8(key, Field::MetaKey)?, utf8(value, Field::MetaValue)?);
        }

        Ok(Self {
            head_length: prefix.head_length,
            body_length: prefix.body_length,
            message_id: prefix.message_id,
            version: prefix.version,
            compressor: prefix.compressor,
            serializer: prefix.serializer,
            service_name,
            method_name,
            meta,
            data: Bytes::copy_from_slice(reader.rest()),
        })
    }
}

fn check_reserved(field: Field, bytes: &[u8]) -> Result<(), ProtocolError> {
    match bytes
        .iter()
        .find(|&&b| b == FIELD_SEPARATOR || b == PAIR_SEPARATOR)
    {
        Some(&byte) => Err(ProtocolError::InvalidField { field, byte }),
        None => Ok(()),
    }
}

fn utf8(bytes: &[u8], field: Field) -> Result<String, ProtocolError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| ProtocolError::InvalidUtf8(field))
}

fn sorted_meta<S>(meta: &HashMap<String, String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    meta.iter().collect::<BTreeMap<_, _>>().serialize(serializer)
}
