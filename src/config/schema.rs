//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Backoff between attempts on different targets.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// API definitions, each mapping matched requests to upstream targets.
    pub apis: Vec<ApiConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest body captured, inbound and from upstream, in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline enforced by the HTTP layer, in seconds.
    pub request_secs: u64,

    /// Per-attempt upstream deadline when the API sets none, in milliseconds.
    pub upstream_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_ms: 10_000,
        }
    }
}

/// Retry backoff configuration. Attempt counts are per API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 50,
            max_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One API: how to match it and where to send it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Numeric API identifier, unique across the config.
    pub api_id: u64,

    /// Name for logs.
    pub name: String,

    /// Strategy the API is published under.
    #[serde(default)]
    pub strategy_id: String,

    #[serde(default)]
    pub strategy_name: String,

    /// Host header to match (case-insensitive).
    #[serde(default)]
    pub host: Option<String>,

    /// Request path prefix to match.
    pub path_prefix: String,

    /// Request method to match; any method when absent.
    #[serde(default)]
    pub method: Option<String>,

    /// Upstream servers; the first is tried first, the rest are fallbacks.
    pub target_servers: Vec<String>,

    /// Path prefix prepended to the forwarded path.
    #[serde(default)]
    pub target_url: String,

    /// Method used upstream; the inbound method when absent.
    #[serde(default)]
    pub target_method: Option<String>,

    /// Drop `path_prefix` from the forwarded path.
    #[serde(default)]
    pub strip_prefix: bool,

    /// Collapse repeated slashes in the forwarded path.
    #[serde(default)]
    pub strip_slash: bool,

    /// Extra attempts on fallback servers after a transport failure.
    #[serde(default)]
    pub retry_count: u32,

    /// Per-attempt deadline in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,

    #[serde(default)]
    pub headers: HeaderRewriteConfig,
}

impl ApiConfig {
    /// Per-attempt deadline, falling back to the global upstream timeout.
    pub fn timeout(&self, fallback: &TimeoutConfig) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(fallback.upstream_ms))
    }
}

/// Header mutations applied by the built-in header-rewrite plugin.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderRewriteConfig {
    /// Response headers added on top of the upstream ones.
    pub add: BTreeMap<String, String>,

    /// Response headers replacing the upstream ones.
    pub set: BTreeMap<String, String>,

    /// Outbound request headers replaced before dispatch.
    pub proxy_set: BTreeMap<String, String>,
}
