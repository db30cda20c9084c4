//! Shared fixtures for rpcwire benchmarks.

use bytes::Bytes;
use rpcwire_protocol::{Request, Response};

/// A request with `meta_entries` tracing-style metadata pairs and a payload
/// of `payload_size` bytes.
pub fn sample_request(payload_size: usize, meta_entries: usize) -> Request {
    (0..meta_entries)
        .fold(
            Request::new(1, "InventoryService", "ReserveItems").with_codes(1, 0, 1),
            |request, i| request.with_meta(format!("x-meta-{i}"), format!("value-{i:08}")),
        )
        .with_data(Bytes::from(vec![b'x'; payload_size]))
}

/// A response to [`sample_request`] with `payload_size` bytes of result data.
pub fn sample_response(payload_size: usize) -> Response {
    Response::new(1)
        .with_codes(1, 0, 1)
        .with_data(Bytes::from(vec![b'x'; payload_size]))
}

/// A failed response carrying an error of `error_size` bytes.
pub fn sample_error_response(error_size: usize) -> Response {
    Response::new(1)
        .with_codes(1, 0, 1)
        .with_error(Bytes::from(vec![b'e'; error_size]))
}
