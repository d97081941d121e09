//! Gateway error types.

use axum::http::header::{InvalidHeaderName, InvalidHeaderValue};
use axum::http::method::InvalidMethod;
use thiserror::Error;

/// Errors raised while building, routing or dispatching a request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A plugin or config entry supplied a malformed header name.
    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] InvalidHeaderName),

    /// A plugin or config entry supplied a malformed header value.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),

    #[error("invalid method: {0}")]
    InvalidMethod(#[from] InvalidMethod),

    /// The outbound URI could not be built from target server and path.
    #[error("invalid target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Transport-level failure talking to an upstream.
    #[error("upstream {target} failed: {reason}")]
    Upstream { target: String, reason: String },

    #[error("upstream {target} timed out after {timeout_ms} ms")]
    UpstreamTimeout { target: String, timeout_ms: u64 },

    /// Dispatch was asked to deliver without any candidate target.
    #[error("no upstream target available")]
    NoTarget,
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderName;

    #[test]
    fn test_error_display() {
        let err = GatewayError::UpstreamTimeout {
            target: "127.0.0.1:3000".into(),
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "upstream 127.0.0.1:3000 timed out after 250 ms");

        let err: GatewayError = HeaderName::from_bytes(b"bad header").unwrap_err().into();
        assert!(err.to_string().starts_with("invalid header name"));
    }
}
