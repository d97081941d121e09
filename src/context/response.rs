//! Read-only view of one upstream reply.

use axum::body::Bytes;
use axum::http::{HeaderMap, Response};

use crate::context::body::BodyHandler;

#[derive(Debug, Clone)]
pub struct ResponseReader {
    code: u16,
    text: String,
    headers: HeaderMap,
    body: BodyHandler,
}

impl ResponseReader {
    /// Snapshot a buffered reply. "No reply" is modelled by the caller as `None`.
    pub fn from_reply(reply: Response<Bytes>) -> Self {
        let (parts, body) = reply.into_parts();
        let code = parts.status.as_u16();
        let text = match parts.status.canonical_reason() {
            Some(reason) => format!("{} {}", code, reason),
            None => code.to_string(),
        };
        Self {
            code,
            text,
            headers: parts.headers,
            body: BodyHandler::new(body),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.code
    }

    /// Code plus reason phrase, e.g. `"404 Not Found"`.
    pub fn status(&self) -> &str {
        &self.text
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        self.body.get_body()
    }

    pub fn bytes(&self) -> Bytes {
        self.body.bytes()
    }
}
