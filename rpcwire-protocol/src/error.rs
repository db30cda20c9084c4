//! Protocol error types.

use std::fmt;
use thiserror::Error;

/// Header field a codec error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    HeadLength,
    BodyLength,
    ServiceName,
    MethodName,
    MetaKey,
    MetaValue,
    MetaEntry,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::HeadLength => write!(f, "head_length"),
            Field::BodyLength => write!(f, "body_length"),
            Field::ServiceName => write!(f, "service_name"),
            Field::MethodName => write!(f, "method_name"),
            Field::MetaKey => write!(f, "meta key"),
            Field::MetaValue => write!(f, "meta value"),
            Field::MetaEntry => write!(f, "meta entry"),
        }
    }
}

/// Errors raised while encoding or decoding request/response frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("malformed header: {field} {reason}")]
    MalformedHeader { field: Field, reason: &'static str },

    #[error("inconsistent {field}: declared {declared}, actual {actual}")]
    InconsistentLength {
        field: Field,
        declared: usize,
        actual: usize,
    },

    #[error("invalid {field}: contains reserved separator byte {byte:#04x}")]
    InvalidField { field: Field, byte: u8 },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(Field),

    #[error("invalid codec configuration: {0}")]
    InvalidConfig(&'static str),
}
