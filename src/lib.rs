//! Plugin gateway library.
//!
//! Per-request processing core of an API gateway: a [`context::Context`]
//! carries one request through routing, plugins and upstream dispatch, and
//! finalizes exactly one response.

// Request core
pub mod context;
pub mod error;
pub mod plugin;

// Collaborators
pub mod dispatch;
pub mod routing;

// Surface and cross-cutting concerns
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use context::{Context, ContextProxy};
pub use error::{GatewayError, GatewayResult};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
