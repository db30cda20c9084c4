//! Encoder and buffering decoder for request and response frames.

use crate::config::CodecConfig;
use crate::error::ProtocolError;
use crate::frame::peek_frame_len;
use crate::request::Request;
use crate::response::Response;
use bytes::{Bytes, BytesMut};

/// Encodes requests and responses under a shared configuration.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: CodecConfig,
}

impl Encoder {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encodes a request into a frame.
    pub fn encode_request(&self, request: &Request) -> Result<BytesMut, ProtocolError> {
        request.encode_with(&self.config)
    }

    /// Encodes a response into a frame.
    pub fn encode_response(&self, response: &Response) -> Result<BytesMut, ProtocolError> {
        response.encode_with(&self.config)
    }
}

/// Accumulates stream input and splits it into whole frames.
///
/// A bad prefix (header length below 15, frame over the size limit) is
/// reported without consuming anything: the stream cannot be resynchronised
/// after it, so callers should drop the connection. A whole frame whose
/// header or body fails to decode is consumed before the error is returned,
/// and decoding can continue with the next frame.
pub struct Decoder {
    buffer: BytesMut,
    config: CodecConfig,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            config,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Appends bytes to the internal buffer.
    pub fn extend_bytes(&mut self, data: Bytes) {
        self.buffer.extend_from_slice(&data);
    }

    /// Splits off the next complete frame, if one is buffered.
    pub fn decode_frame(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        match peek_frame_len(&self.buffer, self.config.max_frame_size)? {
            Some(len) if self.buffer.len() >= len => Ok(Some(self.buffer.split_to(len).freeze())),
            _ => Ok(None),
        }
    }

    /// Attempts to decode the next request from the buffer.
    pub fn decode_request(&mut self) -> Result<Option<Request>, ProtocolError> {
        match self.decode_frame()? {
            Some(frame) => Ok(Some(Request::decode_with(&frame, &self.config)?)),
            None => Ok(None),
        }
    }

    /// Attempts to decode the next response from the buffer.
    pub fn decode_response(&mut self) -> Result<Option<Response>, ProtocolError> {
        match self.decode_frame()? {
            Some(frame) => Ok(Some(Response::decode_with(&frame, &self.config)?)),
            None => Ok(None),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request(id: u32) -> Request {
        Request::new(id, "OrderService", "Place")
            .with_meta("trace-id", format!("t-{id}"))
            .with_data(format!("order-{id}").into_bytes())
    }

    #[test]
    fn test_encoder_decoder_roundtrip() {
        let encoder = Encoder::default();
        let encoded = encoder.encode_request(&sample_request(42)).unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&encoded);

        let decoded = decoder.decode_request().unwrap().unwrap();
        assert_eq!(decoded.message_id, 42);
        assert_eq!(decoded.method_name, "Place");
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_partial_frame_decoding() {
        let encoded = Encoder::default()
            .encode_request(&sample_request(1))
            .unwrap();

        let mut decoder = Decoder::new();

        // Not even a full prefix
        decoder.extend(&encoded[..10]);
        assert!(decoder.decode_request().unwrap().is_none());

        // Prefix but not the whole frame
        decoder.extend(&encoded[10..20]);
        assert!(decoder.decode_request().unwrap().is_none());
        assert_eq!(decoder.buffered(), 20);

        decoder.extend(&encoded[20..]);
        let decoded = decoder.decode_request().unwrap().unwrap();
        assert_eq!(decoded.data.as_ref(), b"order-1");
    }

    #[test]
    fn test_multiple_frames_in_buffer() {
        let encoder = Encoder::default();
        let mut decoder = Decoder::new();
        for id in 1..=3 {
            decoder.extend(&encoder.encode_request(&sample_request(id)).unwrap());
        }

        for id in 1..=3 {
            let decoded = decoder.decode_request().unwrap().unwrap();
            assert_eq!(decoded.message_id, id);
            assert_eq!(decoded.meta["trace-id"], format!("t-{id}"));
        }
        assert!(decoder.decode_request().unwrap().is_none());
    }

    #[test]
    fn test_encode_response() {
        let request = sample_request(9);
        let response = Response::for_request(&request).with_data(&b"accepted"[..]);
        let encoded = Encoder::default().encode_response(&response).unwrap();

        let mut decoder = Decoder::new();
        decoder.extend_bytes(encoded.freeze());
        let decoded = decoder.decode_response().unwrap().unwrap();

        assert_eq!(decoded.message_id, 9);
        assert!(!decoded.is_error());
        assert_eq!(decoded.data.as_ref(), b"accepted");
    }

    #[test]
    fn test_decode_frame_raw() {
        let encoded = Response::new(3).with_data(&b"xyz"[..]).encode().unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&encoded);
        decoder.extend(b"\x00\x00");

        let frame = decoder.decode_frame().unwrap().unwrap();
        assert_eq!(frame.as_ref(), &encoded[..]);
        assert_eq!(decoder.buffered(), 2);
    }

    #[test]
    fn test_decoder_frame_too_large() {
        let config = CodecConfig::default().with_max_frame_size(20);
        let encoded = Response::new(1).with_data(vec![0u8; 32]).encode().unwrap();

        let mut decoder = Decoder::with_config(config);
        // The prefix alone is enough to reject the frame
        decoder.extend(&encoded[..15]);
        assert!(matches!(
            decoder.decode_response(),
            Err(ProtocolError::FrameTooLarge { size: 47, max: 20 })
        ));
    }

    #[test]
    fn test_malformed_frame_is_consumed() {
        // Meta entry without a pair separator: head = 15 + 2 + 2 + 7
        let mut wire: Vec<u8> = vec![0, 0, 0, 26, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0];
        wire.extend_from_slice(b"s\nm\nnopair\n");
        let good = sample_request(2).encode().unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&wire);
        decoder.extend(&good);

        assert!(matches!(
            decoder.decode_request(),
            Err(ProtocolError::MalformedHeader { .. })
        ));
        assert_eq!(decoder.buffered(), good.len());

        let next = decoder.decode_request().unwrap().unwrap();
        assert_eq!(next.message_id, 2);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_bad_prefix_is_kept() {
        // head_length 4 is below the prefix size
        let wire: [u8; 15] = [0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0];

        let mut decoder = Decoder::new();
        decoder.extend(&wire);

        assert!(matches!(
            decoder.decode_request(),
            Err(ProtocolError::InconsistentLength { .. })
        ));
        assert_eq!(decoder.buffered(), wire.len());
    }

    #[test]
    fn test_encoder_uses_config() {
        let encoder = Encoder::new(CodecConfig::default().with_validate_fields(false));
        assert!(!encoder.config().validate_fields);

        let request = Request::new(1, "svc", "m").with_meta("k\n", "v");
        assert!(encoder.encode_request(&request).is_ok());
        assert!(Encoder::default().encode_request(&request).is_err());
    }

    #[test]
    fn test_decoder_buffered() {
        let mut decoder = Decoder::new();
        assert_eq!(decoder.buffered(), 0);

        decoder.extend(b"some data");
        assert_eq!(decoder.buffered(), 9);

        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_default() {
        let decoder = Decoder::default();
        assert_eq!(decoder.buffered(), 0);
    }
}
