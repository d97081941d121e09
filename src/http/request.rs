//! Request identification.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID when the client sent none
//! - Read the ID back for the context and logs
//! - Reassemble the request head from extracted pieces
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A client-supplied `x-request-id` is kept as is

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, Method, Request, Uri, Version};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// UUID v4 generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// The request ID set by the layer, or the raw header, or `"unknown"`.
pub fn request_id_of(parts: &Parts) -> String {
    parts
        .extensions
        .get::<RequestId>()
        .map(RequestId::header_value)
        .or_else(|| parts.headers.get(X_REQUEST_ID))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Rebuild a request head. The body is extracted separately so the
/// configured body limit applies.
pub fn assemble_head(
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
) -> Parts {
    let mut request = Request::new(());
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.version_mut() = version;
    *request.headers_mut() = headers;
    *request.extensions_mut() = extensions;
    request.into_parts().0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_uuids() {
        let request = Request::builder().body(()).unwrap();
        let mut make = UuidRequestId;
        let id = make.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
        let other = make.make_request_id(&request).unwrap();
        assert_ne!(id.header_value(), other.header_value());
    }

    #[test]
    fn test_assemble_head() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc"));
        let parts = assemble_head(
            Method::PUT,
            Uri::from_static("/a?b=c"),
            Version::HTTP_2,
            headers,
            Extensions::new(),
        );
        assert_eq!(parts.method, Method::PUT);
        assert_eq!(parts.uri.query(), Some("b=c"));
        assert_eq!(parts.version, Version::HTTP_2);
        assert_eq!(request_id_of(&parts), "abc");
    }

    #[test]
    fn test_request_id_of() {
        let (parts, _) = Request::builder()
            .header(X_REQUEST_ID, "abc-123")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(request_id_of(&parts), "abc-123");

        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(request_id_of(&parts), "unknown");

        parts
            .extensions
            .insert(RequestId::new(HeaderValue::from_static("from-layer")));
        assert_eq!(request_id_of(&parts), "from-layer");
    }
}
