//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Select pretty or JSON output from config
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - Both format layers are optional so one registry type serves both

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Install the global subscriber. Calling it twice is an error reported by
/// `try_init`, which is ignored so tests can share a process.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let json_layer = (config.log_format == LogFormat::Json)
        .then(|| fmt::layer().json().with_target(true).with_current_span(false));
    let pretty_layer = (config.log_format == LogFormat::Pretty).then(|| fmt::layer().with_target(true));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init();
}

fn default_directives(level: &str) -> String {
    format!("plugin_gateway={level},tower_http={level}")
}
