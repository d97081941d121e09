//! Dispatch subsystem: delivering the proxy request upstream.
//!
//! # Data Flow
//! ```text
//! final target + retry candidates (opaque strings on the context)
//!     → dispatch() walks candidates in order
//!         → Dispatcher::deliver (one attempt, under timeout)
//!         → on transport error / timeout: backoff, next candidate
//!     → Some(Delivered) on the first reply, None when every attempt failed
//! ```
//!
//! # Design Decisions
//! - Any HTTP reply is final, 5xx included; only transport failures retry
//! - Attempts are bounded by the API's retry count and the candidate list
//! - The context never retries; it only stores the candidate list

pub mod client;

use std::future::Future;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::Response;
use rand::Rng;

use crate::context::Request;
use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;

pub use client::HttpDispatcher;

/// Separator of the encoded retry candidate list.
pub const RETRY_SEPARATOR: char = ',';

/// Split an encoded candidate list, dropping empty entries.
pub fn parse_retry_targets(encoded: &str) -> Vec<String> {
    encoded
        .split(RETRY_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn encode_retry_targets<S: AsRef<str>>(targets: &[S]) -> String {
    targets
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&RETRY_SEPARATOR.to_string())
}

/// One delivery attempt against one target.
pub trait Dispatcher: Send + Sync {
    fn deliver(
        &self,
        target: &str,
        request: &Request,
    ) -> impl Future<Output = GatewayResult<Response<Bytes>>> + Send;
}

/// Per-API delivery limits.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retry_count: u32,
    /// Deadline for each single attempt.
    pub timeout: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 0,
            timeout: Duration::from_secs(10),
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): doubling from
    /// `base_delay`, capped at `max_delay`, plus up to 10% jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let base = self.base_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        let delay = base
            .saturating_mul(2u64.saturating_pow(retry - 1))
            .min(max);

        let spread = delay / 10;
        let jitter = if spread > 0 {
            rand::thread_rng().gen_range(0..spread)
        } else {
            0
        };
        Duration::from_millis(delay + jitter)
    }
}

/// A reply and the target that produced it.
#[derive(Debug)]
pub struct Delivered {
    pub target: String,
    pub reply: Response<Bytes>,
}

/// Deliver `request` to `final_target`, falling back to the encoded retry
/// candidates. Returns `None` when no attempt produced a reply.
pub async fn dispatch<D: Dispatcher>(
    dispatcher: &D,
    request: &Request,
    final_target: &str,
    retry_targets: &str,
    policy: &RetryPolicy,
) -> Option<Delivered> {
    let mut candidates: Vec<String> = Vec::new();
    if !final_target.is_empty() {
        candidates.push(final_target.to_string());
    }
    candidates.extend(parse_retry_targets(retry_targets));

    if candidates.is_empty() {
        tracing::warn!(error = %GatewayError::NoTarget, "Dispatch skipped");
        return None;
    }

    let max_attempts = (policy.retry_count as usize + 1).min(candidates.len());
    for (attempt, target) in candidates.into_iter().take(max_attempts).enumerate() {
        if attempt > 0 {
            tokio::time::sleep(policy.backoff(attempt as u32)).await;
        }

        let started = Instant::now();
        let attempt_future = dispatcher.deliver(&target, request);
        let result = match tokio::time::timeout(policy.timeout, attempt_future).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::UpstreamTimeout {
                target: target.clone(),
                timeout_ms: policy.timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(reply) => {
                metrics::record_upstream_attempt(&target, "reply", started);
                tracing::debug!(
                    upstream = %target,
                    attempt = attempt + 1,
                    status = reply.status().as_u16(),
                    "Upstream replied"
                );
                return Some(Delivered { target, reply });
            }
            Err(e) => {
                let outcome = if matches!(e, GatewayError::UpstreamTimeout { .. }) {
                    "timeout"
                } else {
                    "error"
                };
                metrics::record_upstream_attempt(&target, outcome, started);
                tracing::warn!(
                    upstream = %target,
                    attempt = attempt + 1,
                    max_attempts,
                    error = %e,
                    "Upstream attempt failed"
                );
            }
        }
    }
    None
}
