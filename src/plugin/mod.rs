//! Plugin subsystem.
//!
//! # Data Flow
//! ```text
//! Context created, route applied
//!     → PluginChain::run(Phase::Request)   (may answer and skip dispatch)
//!     → dispatch + ingestion
//!     → PluginChain::run(Phase::Response)
//!     → Context::finish
//! ```
//!
//! # Design Decisions
//! - Plugins only see `&mut dyn ContextProxy`
//! - The chain runs plugins in the order it was given; selecting and
//!   ordering them is the caller's business
//! - Plugins run one after another, never concurrently on one context

pub mod headers;

use std::fmt;
use std::sync::Arc;

use crate::context::ContextProxy;

pub use headers::HeaderRewrite;

/// What the chain should do after a plugin returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginFlow {
    Continue,
    /// The plugin produced the answer; stop this phase (and skip dispatch
    /// when returned from the request phase).
    Respond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before dispatch.
    Request,
    /// After ingestion (or after a failed dispatch).
    Response,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Request => write!(f, "request"),
            Phase::Response => write!(f, "response"),
        }
    }
}

/// A unit of per-request behaviour.
pub trait Plugin: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn on_request(&self, _ctx: &mut dyn ContextProxy) -> PluginFlow {
        PluginFlow::Continue
    }

    fn on_response(&self, _ctx: &mut dyn ContextProxy) -> PluginFlow {
        PluginFlow::Continue
    }
}

/// Ordered list of plugins for one API.
#[derive(Debug, Clone, Default)]
pub struct PluginChain {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginChain {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn push(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run every plugin for `phase` until one answers.
    pub fn run(&self, phase: Phase, ctx: &mut dyn ContextProxy) -> PluginFlow {
        for plugin in &self.plugins {
            let flow = match phase {
                Phase::Request => plugin.on_request(ctx),
                Phase::Response => plugin.on_response(ctx),
            };
            tracing::trace!(
                request_id = %ctx.request_id(),
                plugin = plugin.name(),
                %phase,
                ?flow,
                "Plugin ran"
            );
            if flow == PluginFlow::Respond {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    plugin = plugin.name(),
                    %phase,
                    "Plugin answered, chain stopped"
                );
                return PluginFlow::Respond;
            }
        }
        PluginFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BufferedWriter, Context, RequestReader};
    use axum::body::Bytes;
    use axum::http;

    #[derive(Debug)]
    struct Recorder(&'static str);

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.0
        }

        fn on_request(&self, ctx: &mut dyn ContextProxy) -> PluginFlow {
            let mut seen = ctx.store().get::<Vec<&'static str>>("seen").cloned().unwrap_or_default();
            seen.push(self.0);
            ctx.store_mut().set("seen", seen);
            PluginFlow::Continue
        }
    }

    #[derive(Debug)]
    struct Deny;

    impl Plugin for Deny {
        fn name(&self) -> &str {
            "deny"
        }

        fn on_request(&self, ctx: &mut dyn ContextProxy) -> PluginFlow {
            ctx.set_status(403, "403 Forbidden");
            ctx.set_body(Bytes::from_static(b"denied"));
            PluginFlow::Respond
        }
    }

    fn context() -> Context<BufferedWriter> {
        let (parts, _) = http::Request::builder().uri("/").body(()).unwrap().into_parts();
        Context::new(RequestReader::new(parts, Bytes::new()), "req", BufferedWriter::new())
    }

    #[test]
    fn test_runs_in_given_order() {
        let chain = PluginChain::new(vec![
            Arc::new(Recorder("b")),
            Arc::new(Recorder("a")),
            Arc::new(Recorder("c")),
        ]);
        let mut ctx = context();

        assert_eq!(chain.run(Phase::Request, &mut ctx), PluginFlow::Continue);
        assert_eq!(
            ctx.store().get::<Vec<&'static str>>("seen"),
            Some(&vec!["b", "a", "c"])
        );
    }

    #[test]
    fn test_respond_stops_chain() {
        let chain = PluginChain::new(vec![
            Arc::new(Recorder("first")),
            Arc::new(Deny),
            Arc::new(Recorder("never")),
        ]);
        let mut ctx = context();

        assert_eq!(chain.run(Phase::Request, &mut ctx), PluginFlow::Respond);
        assert_eq!(ctx.status_code(), 403);
        assert_eq!(
            ctx.store().get::<Vec<&'static str>>("seen"),
            Some(&vec!["first"])
        );
    }

    #[test]
    fn test_default_hooks_continue() {
        let chain = PluginChain::new(vec![Arc::new(Deny)]);
        let mut ctx = context();
        assert_eq!(chain.run(Phase::Response, &mut ctx), PluginFlow::Continue);
        assert_eq!(ctx.status_code(), 0);
    }
}
