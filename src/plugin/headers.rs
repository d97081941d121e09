//! Config-driven header rewriting.
//!
//! Response mutations are recorded in the request phase, before the
//! upstream has answered. They land in the append/set tiers, which survive
//! ingestion and are applied at finish.

use axum::http::header::{HeaderName, HeaderValue};

use crate::config::HeaderRewriteConfig;
use crate::context::ContextProxy;
use crate::error::GatewayResult;
use crate::plugin::{Plugin, PluginFlow};

#[derive(Debug, Clone, Default)]
pub struct HeaderRewrite {
    add: Vec<(HeaderName, HeaderValue)>,
    set: Vec<(HeaderName, HeaderValue)>,
    proxy_set: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderRewrite {
    pub fn from_config(config: &HeaderRewriteConfig) -> GatewayResult<Self> {
        Ok(Self {
            add: parse_all(config.add.iter())?,
            set: parse_all(config.set.iter())?,
            proxy_set: parse_all(config.proxy_set.iter())?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.set.is_empty() && self.proxy_set.is_empty()
    }
}

fn parse_all<'a>(
    pairs: impl Iterator<Item = (&'a String, &'a String)>,
) -> GatewayResult<Vec<(HeaderName, HeaderValue)>> {
    pairs
        .map(|(name, value)| -> GatewayResult<(HeaderName, HeaderValue)> {
            Ok((
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            ))
        })
        .collect()
}

impl Plugin for HeaderRewrite {
    fn name(&self) -> &str {
        "header-rewrite"
    }

    fn on_request(&self, ctx: &mut dyn ContextProxy) -> PluginFlow {
        for (name, value) in &self.proxy_set {
            ctx.proxy_mut().headers_mut().insert(name.clone(), value.clone());
        }
        for (name, value) in &self.add {
            ctx.add_header(name.clone(), value.clone());
        }
        for (name, value) in &self.set {
            ctx.set_header(name.clone(), value.clone());
        }
        PluginFlow::Continue
    }
}
