//! Capability surface handed to plugins and collaborators.
//!
//! Object safe: plugins receive `&mut dyn ContextProxy` and never see the
//! writer type the context was built with.

use axum::body::Bytes;
use axum::http::header::{HeaderName, HeaderValue};

use crate::context::cookies::CookiesHandler;
use crate::context::header::PriorityHeader;
use crate::context::request::{Request, RequestReader};
use crate::context::response::ResponseReader;
use crate::context::status::StatusHandler;
use crate::context::store::StoreHandler;

pub trait ContextProxy: Send {
    /// Original inbound request.
    fn request(&self) -> &RequestReader;

    /// Outbound request as currently planned.
    fn proxy(&self) -> &Request;
    fn proxy_mut(&mut self) -> &mut Request;

    /// Upstream reply, once ingested.
    fn proxy_response(&self) -> Option<&ResponseReader>;

    fn priority_header(&self) -> &PriorityHeader;
    fn priority_header_mut(&mut self) -> &mut PriorityHeader;

    fn status_handler(&self) -> &StatusHandler;
    fn status_handler_mut(&mut self) -> &mut StatusHandler;

    fn store(&self) -> &StoreHandler;
    fn store_mut(&mut self) -> &mut StoreHandler;

    fn cookies(&self) -> &CookiesHandler;

    /// Response body buffer.
    fn body(&self) -> &[u8];
    fn set_body(&mut self, body: Bytes);

    fn request_id(&self) -> &str;

    fn strategy_id(&self) -> &str;
    fn set_strategy_id(&mut self, strategy_id: String);
    fn strategy_name(&self) -> &str;
    fn set_strategy_name(&mut self, strategy_name: String);
    fn api_id(&self) -> u64;
    fn set_api_id(&mut self, api_id: u64);

    fn final_target_server(&self) -> &str;
    fn set_final_target_server(&mut self, target: String);
    /// Encoded fallback list, see [`crate::dispatch::parse_retry_targets`].
    fn retry_target_servers(&self) -> &str;
    fn set_retry_target_servers(&mut self, targets: String);

    fn add_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.priority_header_mut().add_header(name, value);
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.priority_header_mut().set_header(name, value);
    }

    fn set_status(&mut self, code: u16, text: &str) {
        self.status_handler_mut().set_status(code, text);
    }

    fn status_code(&self) -> u16 {
        self.status_handler().status_code()
    }
}
