//! Output side of a context: where the finalized triple goes.

use std::io;

use axum::body::Body;
use axum::http::{HeaderMap, Response, StatusCode};

/// Sink for the one-time response write.
///
/// Finalize fills `headers_mut`, then calls `write_status`, then (when the
/// status allows a body) `write_body`.
pub trait ResponseWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn write_status(&mut self, code: u16);

    /// Returns the number of bytes accepted.
    fn write_body(&mut self, body: &[u8]) -> io::Result<usize>;
}

/// Collects the response in memory and turns it into an axum response.
#[derive(Debug, Default)]
pub struct BufferedWriter {
    headers: HeaderMap,
    status: Option<u16>,
    body: Vec<u8>,
}

impl BufferedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Build the response. Codes axum cannot represent become 502.
    pub fn into_response(self) -> Response<Body> {
        let code = self.status.unwrap_or(200);
        let status = StatusCode::from_u16(code).unwrap_or_else(|_| {
            tracing::warn!(code, "Unrepresentable status code, answering 502");
            StatusCode::BAD_GATEWAY
        });

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for BufferedWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, code: u16) {
        self.status = Some(code);
    }

    fn write_body(&mut self, body: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(body);
        Ok(body.len())
    }
}
