//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID is a field on every per-request log event
//! - Metric recording is a no-op until an exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
