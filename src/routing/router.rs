//! API lookup and route application.
//!
//! # Responsibilities
//! - Store compiled API routes
//! - Look up the matching route for a request
//! - Stamp the matched API onto the context and rewrite the proxy request
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) ordered scan (acceptable for typical API counts)
//! - Explicit `None` rather than a silent default route

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;

use crate::config::{ApiConfig, RetryConfig, TimeoutConfig};
use crate::context::{ContextProxy, RequestReader};
use crate::dispatch::{encode_retry_targets, RetryPolicy};
use crate::error::GatewayResult;
use crate::plugin::{HeaderRewrite, Plugin, PluginChain};
use crate::routing::matcher::{
    strip_path_prefix, AndMatcher, HostMatcher, Matcher, MethodMatcher, PathPrefixMatcher,
};

/// A compiled API.
#[derive(Debug)]
pub struct ApiRoute {
    api_id: u64,
    name: String,
    strategy_id: String,
    strategy_name: String,
    priority: u32,
    matcher: AndMatcher,
    path_prefix: String,
    targets: Vec<String>,
    target_url: String,
    target_method: Option<Method>,
    strip_prefix: bool,
    strip_slash: bool,
    policy: RetryPolicy,
    plugins: PluginChain,
}

impl ApiRoute {
    pub fn from_config(
        config: &ApiConfig,
        timeouts: &TimeoutConfig,
        retries: &RetryConfig,
    ) -> GatewayResult<Self> {
        let mut matchers: Vec<Box<dyn Matcher>> =
            vec![Box::new(PathPrefixMatcher::new(config.path_prefix.clone()))];
        if let Some(host) = &config.host {
            matchers.push(Box::new(HostMatcher::new(host.clone())));
        }
        if let Some(method) = &config.method {
            matchers.push(Box::new(MethodMatcher::new(Method::from_str(method)?)));
        }

        let target_method = config
            .target_method
            .as_deref()
            .map(Method::from_str)
            .transpose()?;

        let mut plugins = PluginChain::default();
        let rewrite = HeaderRewrite::from_config(&config.headers)?;
        if !rewrite.is_empty() {
            plugins.push(Arc::new(rewrite) as Arc<dyn Plugin>);
        }

        Ok(Self {
            api_id: config.api_id,
            name: config.name.clone(),
            strategy_id: config.strategy_id.clone(),
            strategy_name: config.strategy_name.clone(),
            priority: config.priority,
            matcher: AndMatcher::new(matchers),
            path_prefix: config.path_prefix.clone(),
            targets: config
                .target_servers
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            target_url: config.target_url.clone(),
            target_method,
            strip_prefix: config.strip_prefix,
            strip_slash: config.strip_slash,
            policy: RetryPolicy {
                retry_count: config.retry_count,
                timeout: config.timeout(timeouts),
                base_delay: Duration::from_millis(retries.base_delay_ms),
                max_delay: Duration::from_millis(retries.max_delay_ms),
            },
            plugins,
        })
    }

    pub fn api_id(&self) -> u64 {
        self.api_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn plugins(&self) -> &PluginChain {
        &self.plugins
    }

    /// Attach extra plugins after the config-driven ones.
    pub fn push_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn matches(&self, req: &RequestReader) -> bool {
        self.matcher.matches(req)
    }

    /// Stamp this API onto the context: identity, targets, outbound path and method.
    pub fn apply(&self, ctx: &mut dyn ContextProxy) {
        ctx.set_api_id(self.api_id);
        ctx.set_strategy_id(self.strategy_id.clone());
        ctx.set_strategy_name(self.strategy_name.clone());

        let (first, rest) = match self.targets.split_first() {
            Some((first, rest)) => (first.clone(), encode_retry_targets(rest)),
            None => (String::new(), String::new()),
        };
        ctx.set_final_target_server(first);
        ctx.set_retry_target_servers(rest);

        let path = self.rewrite_path(ctx.request().path());
        let proxy = ctx.proxy_mut();
        proxy.set_target_url(path);
        if let Some(method) = &self.target_method {
            proxy.set_method(method.clone());
        }

        tracing::debug!(
            api_id = self.api_id,
            api = %self.name,
            upstream = %ctx.final_target_server(),
            path = %ctx.proxy().target_url(),
            "API applied"
        );
    }

    fn rewrite_path(&self, path: &str) -> String {
        let rest = if self.strip_prefix {
            strip_path_prefix(path, &self.path_prefix).unwrap_or(path)
        } else {
            path
        };

        let mut rewritten = String::with_capacity(self.target_url.len() + rest.len() + 1);
        rewritten.push_str(self.target_url.trim_end_matches('/'));
        if !rest.starts_with('/') {
            rewritten.push('/');
        }
        rewritten.push_str(rest);

        if self.strip_slash {
            rewritten = collapse_slashes(&rewritten);
        }
        rewritten
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        out.push(c);
    }
    out
}

/// Ordered, immutable set of API routes.
#[derive(Debug, Default)]
pub struct ApiRouter {
    routes: Vec<ApiRoute>,
}

impl ApiRouter {
    /// Compile routes, ordered by priority (desc) then prefix length (desc).
    pub fn from_config(
        apis: &[ApiConfig],
        timeouts: &TimeoutConfig,
        retries: &RetryConfig,
    ) -> GatewayResult<Self> {
        let mut routes = apis
            .iter()
            .map(|api| ApiRoute::from_config(api, timeouts, retries))
            .collect::<GatewayResult<Vec<_>>>()?;
        routes.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.path_prefix.len().cmp(&a.path_prefix.len()))
        });

        tracing::info!(routes = routes.len(), "API router compiled");
        Ok(Self { routes })
    }

    /// First route matching the request.
    pub fn match_request(&self, req: &RequestReader) -> Option<&ApiRoute> {
        self.routes.iter().find(|r| r.matches(req))
    }

    pub fn routes_mut(&mut self) -> impl Iterator<Item = &mut ApiRoute> {
        self.routes.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
