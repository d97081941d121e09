//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → gateway handler: capture → Context → route → plugins → dispatch → finish
//!     → BufferedWriter → axum Response
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{request_id_of, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
