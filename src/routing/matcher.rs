//! Route matching logic.
//!
//! # Responsibilities
//! - Match host header (exact match, case-insensitive)
//! - Match path prefix (case-sensitive)
//! - Match request method
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching ignores case and any port suffix
//! - Path matching is case-sensitive
//! - Empty condition = always matches (wildcard)
//! - No regex to guarantee O(n) matching

use axum::http::Method;

use crate::context::RequestReader;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RequestReader) -> bool;
}

/// Matches the Host header.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &RequestReader) -> bool {
        req.host()
            .map(|h| h.split(':').next().unwrap_or(h))
            .map(|h| h.eq_ignore_ascii_case(&self.expected_host))
            .unwrap_or(false)
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &RequestReader) -> bool {
        strip_path_prefix(req.path(), &self.prefix).is_some()
    }
}

/// The part of `path` after `prefix`, when `prefix` ends on a segment boundary.
///
/// `/users` covers `/users` and `/users/7` but not `/usersettings`.
pub fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/') {
        Some(rest)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: Method,
}

impl MethodMatcher {
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &RequestReader) -> bool {
        *req.method() == self.method
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &RequestReader) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }
}
