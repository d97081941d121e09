//! Per-request context subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → request.rs (RequestReader snapshot + editable proxy Request)
//!     → Context::new (empty header tiers, status, store, cookies)
//!     → plugins mutate through ContextProxy (proxy.rs)
//!     → dispatch collaborator delivers the proxy request
//!     → Context::set_proxy_response (response.rs; seeds body, status, base headers)
//!     → Context::finish (header.rs merge, writer.rs output)
//! ```
//!
//! # Lifecycle
//! ```text
//! Created → (plugin mutation)* → Dispatched? → Finished
//! ```
//! `finish` consumes the context, so it cannot run twice.
//!
//! # Design Decisions
//! - Each capability is its own component; the context only composes them
//! - Header tiers merge at finish, never eagerly
//! - An unset status resolves to 504 (nobody answered in time)
//! - Once a body may be sent, the buffer is the only source of Content-Length

pub mod body;
pub mod cookies;
pub mod header;
pub mod proxy;
pub mod request;
pub mod response;
pub mod status;
pub mod store;
pub mod writer;

use axum::body::Bytes;
use axum::http::header::{HeaderValue, CONTENT_LENGTH};
use axum::http::Response;

pub use body::{BodyHandler, BodyReader};
pub use cookies::{Cookie, CookiesHandler};
pub use header::PriorityHeader;
pub use proxy::ContextProxy;
pub use request::{Request, RequestReader};
pub use response::ResponseReader;
pub use status::StatusHandler;
pub use store::StoreHandler;
pub use writer::{BufferedWriter, ResponseWriter};

/// Status used when nobody set one before finish.
pub const UNSET_STATUS_FALLBACK: u16 = 504;

/// Whether a response with `code` may carry a body.
pub fn body_allowed(code: u16) -> bool {
    !matches!(code, 100..=199 | 204 | 304)
}

/// State carried through the plugin chain for one inbound request.
#[derive(Debug)]
pub struct Context<W: ResponseWriter> {
    writer: W,
    cookies: CookiesHandler,
    header: PriorityHeader,
    status: StatusHandler,
    store: StoreHandler,
    request: RequestReader,
    proxy_request: Request,
    proxy_response: Option<ResponseReader>,
    body: BodyHandler,
    request_id: String,
    strategy_id: String,
    strategy_name: String,
    api_id: u64,
    final_target_server: String,
    retry_target_servers: String,
}

/// Outcome of [`Context::finish`].
#[derive(Debug)]
pub struct Finished<W> {
    /// The writer, handed back so the caller can flush or convert it.
    pub writer: W,
    /// Body bytes accepted by the writer; short on write failure.
    pub bytes_written: usize,
    pub status_code: u16,
}

impl<W: ResponseWriter> Context<W> {
    /// Create the context for one request. The writer is owned until `finish`.
    pub fn new(request: RequestReader, request_id: impl Into<String>, writer: W) -> Self {
        let proxy_request = Request::from_reader(&request);
        Self {
            writer,
            cookies: CookiesHandler::from_headers(request.headers()),
            header: PriorityHeader::new(),
            status: StatusHandler::new(),
            store: StoreHandler::new(),
            request,
            proxy_request,
            proxy_response: None,
            body: BodyHandler::default(),
            request_id: request_id.into(),
            strategy_id: String::new(),
            strategy_name: String::new(),
            api_id: 0,
            final_target_server: String::new(),
            retry_target_servers: String::new(),
        }
    }

    /// Ingest the upstream reply, or `None` when dispatch produced nothing.
    ///
    /// A reply replaces the body, the status and the base header tier.
    /// Append and set tiers recorded earlier still apply at finish.
    pub fn set_proxy_response(&mut self, reply: Option<Response<Bytes>>) {
        self.proxy_response = reply.map(ResponseReader::from_reply);
        match &self.proxy_response {
            Some(response) => {
                self.body.set_body(response.bytes());
                self.status
                    .set_status(response.status_code(), response.status());
                self.header.replace_base(response.headers().clone());
                tracing::trace!(
                    request_id = %self.request_id,
                    status = response.status_code(),
                    body_len = self.body.len(),
                    "Upstream reply ingested"
                );
            }
            None => {
                tracing::trace!(request_id = %self.request_id, "No upstream reply to ingest");
            }
        }
    }

    /// Resolve status, merge headers and write everything once.
    pub fn finish(mut self) -> Finished<W> {
        let status_code = match self.status.status_code() {
            0 => UNSET_STATUS_FALLBACK,
            code => code,
        };
        let allowed = body_allowed(status_code);

        let merged = self.header.merge();
        if allowed {
            merged.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        }

        let out = self.writer.headers_mut();
        for (name, value) in merged.iter() {
            out.append(name.clone(), value.clone());
        }
        self.writer.write_status(status_code);

        let bytes_written = if allowed {
            match self.writer.write_body(self.body.get_body()) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(
                        request_id = %self.request_id,
                        error = %e,
                        "Response body write failed"
                    );
                    0
                }
            }
        } else {
            0
        };

        tracing::debug!(
            request_id = %self.request_id,
            status = status_code,
            bytes_written,
            "Context finished"
        );

        Finished {
            writer: self.writer,
            bytes_written,
            status_code,
        }
    }
}

impl<W: ResponseWriter + Send> ContextProxy for Context<W> {
    fn request(&self) -> &RequestReader {
        &self.request
    }

    fn proxy(&self) -> &Request {
        &self.proxy_request
    }

    fn proxy_mut(&mut self) -> &mut Request {
        &mut self.proxy_request
    }

    fn proxy_response(&self) -> Option<&ResponseReader> {
        self.proxy_response.as_ref()
    }

    fn priority_header(&self) -> &PriorityHeader {
        &self.header
    }

    fn priority_header_mut(&mut self) -> &mut PriorityHeader {
        &mut self.header
    }

    fn status_handler(&self) -> &StatusHandler {
        &self.status
    }

    fn status_handler_mut(&mut self) -> &mut StatusHandler {
        &mut self.status
    }

    fn store(&self) -> &StoreHandler {
        &self.store
    }

    fn store_mut(&mut self) -> &mut StoreHandler {
        &mut self.store
    }

    fn cookies(&self) -> &CookiesHandler {
        &self.cookies
    }

    fn body(&self) -> &[u8] {
        self.body.get_body()
    }

    fn set_body(&mut self, body: Bytes) {
        self.body.set_body(body);
    }

    fn request_id(&self) -> &str {
        &self.request_id
    }

    fn strategy_id(&self) -> &str {
        &self.strategy_id
    }

    fn set_strategy_id(&mut self, strategy_id: String) {
        self.strategy_id = strategy_id;
    }

    fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    fn set_strategy_name(&mut self, strategy_name: String) {
        self.strategy_name = strategy_name;
    }

    fn api_id(&self) -> u64 {
        self.api_id
    }

    fn set_api_id(&mut self, api_id: u64) {
        self.api_id = api_id;
    }

    fn final_target_server(&self) -> &str {
        &self.final_target_server
    }

    fn set_final_target_server(&mut self, target: String) {
        self.final_target_server = target;
    }

    fn retry_target_servers(&self) -> &str {
        &self.retry_target_servers
    }

    fn set_retry_target_servers(&mut self, targets: String) {
        self.retry_target_servers = targets;
    }
}
