//! Inbound snapshot and outbound proxy request.
//!
//! # Design Decisions
//! - `RequestReader` is what arrived; it is never mutated after capture and is
//!   what logging and route matching look at
//! - `Request` starts as a copy of the snapshot and is what plugins rewrite
//! - The body is captured once, since the transport stream can only be read once

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue, HOST};
use axum::http::request::Parts;
use axum::http::{Method, Uri, Version};
use url::{form_urlencoded, Url};

use crate::context::body::{BodyHandler, BodyReader};
use crate::error::{GatewayError, GatewayResult};

/// Immutable snapshot of the original inbound request.
#[derive(Debug, Clone)]
pub struct RequestReader {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Option<BodyHandler>,
    remote_addr: Option<SocketAddr>,
}

impl RequestReader {
    /// Build from request head plus the already-captured body.
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body: (!body.is_empty()).then(|| BodyHandler::new(body)),
            remote_addr: None,
        }
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn raw_query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Decoded query pairs in arrival order.
    pub fn queries(&self) -> Vec<(String, String)> {
        self.raw_query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    /// First decoded value of a query parameter.
    pub fn query(&self, name: &str) -> Option<String> {
        self.queries()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Host header, falling back to the URI authority.
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
    }

    pub fn body(&self) -> &[u8] {
        self.body.body()
    }

    pub fn body_handler(&self) -> Option<&BodyHandler> {
        self.body.as_ref()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

/// Mutable plan for the outbound call.
///
/// The target server is not part of the request: it lives on the context
/// next to the retry candidates, and dispatch combines the two.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target_url: String,
    queries: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<BodyHandler>,
}

impl Request {
    /// Project the inbound snapshot into an editable outbound request.
    pub fn from_reader(reader: &RequestReader) -> Self {
        Self {
            method: reader.method().clone(),
            target_url: reader.path().to_string(),
            queries: reader.queries(),
            headers: reader.headers().clone(),
            body: reader.body_handler().cloned(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Path sent upstream.
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn set_target_url(&mut self, target_url: impl Into<String>) {
        self.target_url = target_url.into();
    }

    pub fn queries(&self) -> &[(String, String)] {
        &self.queries
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.queries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn add_query(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.queries.push((name.into(), value.into()));
    }

    /// Replace every value of `name` with `value`.
    pub fn set_query(&mut self, name: &str, value: impl Into<String>) {
        self.del_query(name);
        self.queries.push((name.to_string(), value.into()));
    }

    pub fn del_query(&mut self, name: &str) {
        self.queries.retain(|(k, _)| k != name);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn add_header(&mut self, name: &str, value: &str) -> GatewayResult<()> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        self.headers.append(name, HeaderValue::from_str(value)?);
        Ok(())
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> GatewayResult<()> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        self.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(())
    }

    pub fn del_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub fn body(&self) -> &[u8] {
        self.body.body()
    }

    pub fn bytes(&self) -> Bytes {
        self.body.as_ref().map(BodyHandler::bytes).unwrap_or_default()
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(BodyHandler::new(body));
    }

    /// Absolute URI for delivering this request to `server`.
    ///
    /// `server` may be `host:port` or an `http://` URL with an optional base path.
    pub fn url_for(&self, server: &str) -> GatewayResult<Uri> {
        let invalid = |reason: String| GatewayError::InvalidTarget {
            target: server.to_string(),
            reason,
        };

        let base = if server.contains("://") {
            server.to_string()
        } else {
            format!("http://{}", server)
        };
        let mut url = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("target cannot carry a path".into()));
        }

        let prefix = url.path().trim_end_matches('/').to_string();
        let path = if self.target_url.starts_with('/') {
            format!("{}{}", prefix, self.target_url)
        } else {
            format!("{}/{}", prefix, self.target_url)
        };
        url.set_path(&path);

        if self.queries.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(self.queries.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        url.as_str()
            .parse::<Uri>()
            .map_err(|e| invalid(e.to_string()))
    }
}
