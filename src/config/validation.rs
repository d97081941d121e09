//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check addresses, methods and header names parse
//! - Check API ids are unique and every API has somewhere to go
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::Method;
use thiserror::Error;

use crate::config::schema::{ApiConfig, GatewayConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: String, value: String },

    #[error("listener.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("api {api_id}: duplicate api_id")]
    DuplicateApi { api_id: u64 },

    #[error("api {api_id}: target_servers is empty")]
    NoTargets { api_id: u64 },

    #[error("api {api_id}: target {target:?} must be host:port or an http:// URL")]
    UnsupportedTarget { api_id: u64, target: String },

    #[error("api {api_id}: {field} must start with '/', got {value:?}")]
    RelativePath { api_id: u64, field: &'static str, value: String },

    #[error("api {api_id}: invalid method {value:?}")]
    InvalidMethod { api_id: u64, value: String },

    #[error("api {api_id}: invalid header {name:?}")]
    InvalidHeader { api_id: u64, name: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }

    let mut seen = HashSet::new();
    for api in &config.apis {
        if !seen.insert(api.api_id) {
            errors.push(ValidationError::DuplicateApi { api_id: api.api_id });
        }
        validate_api(&mut errors, api);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

fn validate_api(errors: &mut Vec<ValidationError>, api: &ApiConfig) {
    let api_id = api.api_id;

    if api.target_servers.iter().all(|t| t.trim().is_empty()) {
        errors.push(ValidationError::NoTargets { api_id });
    }
    for target in &api.target_servers {
        if !plain_http_target(target) {
            errors.push(ValidationError::UnsupportedTarget {
                api_id,
                target: target.clone(),
            });
        }
    }
    if !api.path_prefix.starts_with('/') {
        errors.push(ValidationError::RelativePath {
            api_id,
            field: "path_prefix",
            value: api.path_prefix.clone(),
        });
    }
    if !api.target_url.is_empty() && !api.target_url.starts_with('/') {
        errors.push(ValidationError::RelativePath {
            api_id,
            field: "target_url",
            value: api.target_url.clone(),
        });
    }

    for method in api.method.iter().chain(api.target_method.iter()) {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidMethod {
                api_id,
                value: method.clone(),
            });
        }
    }

    let headers = &api.headers;
    for (name, value) in headers.add.iter().chain(&headers.set).chain(&headers.proxy_set) {
        let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
            && HeaderValue::from_str(value).is_ok();
        if !valid {
            errors.push(ValidationError::InvalidHeader {
                api_id,
                name: name.clone(),
            });
        }
    }
}

/// Upstreams are reached over plain HTTP only.
fn plain_http_target(target: &str) -> bool {
    let target = target.trim();
    if target.is_empty() {
        return true;
    }
    match target.split_once("://") {
        Some((scheme, _)) => scheme.eq_ignore_ascii_case("http"),
        None => true,
    }
}
