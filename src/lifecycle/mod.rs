//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber wakes → server stops accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; late subscribers still observe a past trigger
//! - In-flight requests finish under the request timeout layer

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::spawn_signal_handler;
