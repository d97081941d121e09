//! Byte buffer holder shared by requests, replies and the context itself.

use axum::body::Bytes;

/// Owns one body buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyHandler {
    body: Bytes,
}

impl BodyHandler {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }

    /// Borrow the buffered bytes.
    pub fn get_body(&self) -> &[u8] {
        &self.body
    }

    /// Cheap handle on the buffer (reference counted, no copy).
    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// Replace the buffer wholesale.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Read access to a body that may not exist.
///
/// An absent holder reads as an empty slice, so callers never need to check
/// for presence before reading.
pub trait BodyReader {
    fn body(&self) -> &[u8];
}

impl BodyReader for BodyHandler {
    fn body(&self) -> &[u8] {
        self.get_body()
    }
}

impl BodyReader for Option<BodyHandler> {
    fn body(&self) -> &[u8] {
        self.as_ref().map(BodyHandler::get_body).unwrap_or_default()
    }
}

impl BodyReader for Option<&BodyHandler> {
    fn body(&self) -> &[u8] {
        self.map(BodyHandler::get_body).unwrap_or_default()
    }
}
