//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming RequestReader (host, path, method)
//!     → router.rs (ordered scan)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched ApiRoute or None
//!
//! Route Compilation (at startup):
//!     ApiConfig[]
//!     → Sort by priority, then prefix length
//!     → Compile matchers and plugin chains
//!     → Freeze as immutable ApiRouter
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins

pub mod matcher;
pub mod router;

pub use matcher::{
    strip_path_prefix, AndMatcher, HostMatcher, Matcher, MethodMatcher, PathPrefixMatcher,
};
pub use router::{ApiRoute, ApiRouter};
