//! Codec configuration.

use crate::error::ProtocolError;
use crate::frame::{DEFAULT_MAX_FRAME_SIZE, FRAME_PREFIX_SIZE};
use serde::{Deserialize, Serialize};

/// Limits and checks applied by the encoder and decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest frame (header + body) accepted on either side.
    pub max_frame_size: usize,
    /// Reject names, keys and values containing a reserved separator
    /// before encoding. Producers on a trusted channel may turn this off.
    pub validate_fields: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            validate_fields: true,
        }
    }
}

impl CodecConfig {
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_validate_fields(mut self, validate_fields: bool) -> Self {
        self.validate_fields = validate_fields;
        self
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.max_frame_size < FRAME_PREFIX_SIZE {
            return Err(ProtocolError::InvalidConfig(
                "max_frame_size is smaller than the frame prefix",
            ));
        }
        Ok(())
    }
}
