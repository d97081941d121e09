//! HTTP delivery over the hyper-util pooled client.
//!
//! # Responsibilities
//! - Build the outbound request from the proxy request and a target server
//! - Strip hop-by-hop headers in both directions
//! - Buffer the upstream body so the context can own it

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::{self, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::context::Request;
use crate::dispatch::Dispatcher;
use crate::error::{GatewayError, GatewayResult};

/// Headers that describe one connection and must not be forwarded.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

#[derive(Clone)]
pub struct HttpDispatcher {
    client: Client<HttpConnector, Body>,
    max_body_size: usize,
}

impl HttpDispatcher {
    /// `max_body_size` caps how much of an upstream body gets buffered.
    pub fn new(max_body_size: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            max_body_size,
        }
    }
}

impl Dispatcher for HttpDispatcher {
    async fn deliver(&self, target: &str, request: &Request) -> GatewayResult<Response<Bytes>> {
        let upstream_err = |reason: String| GatewayError::Upstream {
            target: target.to_string(),
            reason,
        };

        let uri = request.url_for(target)?;
        let mut headers = request.headers().clone();
        strip_hop_by_hop(&mut headers);
        // The client derives Host from the target URI.
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        let mut outbound = http::Request::builder()
            .method(request.method().clone())
            .uri(uri)
            .body(Body::from(request.bytes()))
            .map_err(|e| upstream_err(e.to_string()))?;
        *outbound.headers_mut() = headers;

        tracing::trace!(
            upstream = %target,
            method = %request.method(),
            uri = %outbound.uri(),
            "Sending upstream request"
        );

        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| upstream_err(e.to_string()))?;

        let (mut parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_size)
            .await
            .map_err(|e| upstream_err(format!("reading body: {}", e)))?;
        strip_hop_by_hop(&mut parts.headers);

        Ok(Response::from_parts(parts, body))
    }
}
