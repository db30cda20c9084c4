//! # rpcwire-protocol
//!
//! Binary frame codec for rpcwire request/response exchanges.
//!
//! This crate provides:
//! - Request frames: service name, method name and metadata delimited by
//!   reserved separator bytes, followed by an opaque payload
//! - Response frames: opaque error bytes followed by an opaque payload
//! - A buffering decoder that splits a byte stream into whole frames
//! - Typed errors for truncated, malformed and inconsistent frames
//!
//! The version, compressor and serializer codes are carried unchanged; their
//! meaning belongs to the layer above.

pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod request;
pub mod response;

pub use codec::{Decoder, Encoder};
pub use config::CodecConfig;
pub use error::{Field, ProtocolError};
pub use frame::{
    peek_frame_len, FramePrefix, DEFAULT_MAX_FRAME_SIZE, FIELD_SEPARATOR, FRAME_PREFIX_SIZE,
    PAIR_SEPARATOR,
};
pub use request::Request;
pub use response::Response;
