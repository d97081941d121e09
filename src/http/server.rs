//! HTTP server setup and the gateway handler.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind server to listener and stop on shutdown
//! - Drive one Context per request from capture to finish

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, FailedToBufferBody},
        ConnectInfo, DefaultBodyLimit, State,
    },
    http::{Extensions, HeaderMap, Method, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::context::{BufferedWriter, Context, ContextProxy, RequestReader};
use crate::dispatch::{dispatch, Dispatcher, HttpDispatcher};
use crate::error::GatewayResult;
use crate::http::request::{assemble_head, request_id_of, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::plugin::{Phase, PluginFlow};
use crate::routing::ApiRouter;

/// Application state injected into handlers.
pub struct AppState<D> {
    pub router: Arc<ApiRouter>,
    pub dispatcher: Arc<D>,
}

impl<D> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Build from config with the pooled HTTP dispatcher.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let dispatcher = HttpDispatcher::new(config.listener.max_body_size);
        Self::with_dispatcher(config, dispatcher)
    }

    pub fn with_dispatcher<D: Dispatcher + 'static>(
        config: GatewayConfig,
        dispatcher: D,
    ) -> GatewayResult<Self> {
        let routes = ApiRouter::from_config(&config.apis, &config.timeouts, &config.retries)?;
        Ok(Self::from_parts(config, routes, dispatcher))
    }

    /// Build from an already compiled router, e.g. one with extra plugins attached.
    pub fn from_parts<D: Dispatcher + 'static>(
        config: GatewayConfig,
        routes: ApiRouter,
        dispatcher: D,
    ) -> Self {
        let state = AppState {
            router: Arc::new(routes),
            dispatcher: Arc::new(dispatcher),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router<D: Dispatcher + 'static>(config: &GatewayConfig, state: AppState<D>) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler::<D>))
            .route("/", any(gateway_handler::<D>))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.listener.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server on `listener` until `shutdown` triggers.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: one Context from capture to finish.
async fn gateway_handler<D: Dispatcher + 'static>(
    State(state): State<AppState<D>>,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let parts = assemble_head(method, uri, version, headers, extensions);
    let request_id = request_id_of(&parts);
    let method = parts.method.to_string();

    let body = match body {
        Ok(body) => body,
        Err(rejection) => return reject_body(&request_id, &method, rejection, started),
    };

    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let mut reader = RequestReader::new(parts, body);
    if let Some(addr) = remote_addr {
        reader = reader.with_remote_addr(addr);
    }

    let Some(route) = state.router.match_request(&reader) else {
        tracing::warn!(request_id = %request_id, path = %reader.path(), "No API matched");
        metrics::record_request(&method, 404, "none", started);
        return (StatusCode::NOT_FOUND, "No matching API").into_response();
    };

    let mut ctx = Context::new(reader, request_id.clone(), BufferedWriter::new());
    route.apply(&mut ctx);

    if route.plugins().run(Phase::Request, &mut ctx) == PluginFlow::Continue {
        let delivered = dispatch(
            state.dispatcher.as_ref(),
            ctx.proxy(),
            ctx.final_target_server(),
            ctx.retry_target_servers(),
            route.policy(),
        )
        .await;

        match &delivered {
            Some(d) => tracing::debug!(
                request_id = %request_id,
                upstream = %d.target,
                status = d.reply.status().as_u16(),
                "Dispatched"
            ),
            None => tracing::warn!(
                request_id = %request_id,
                api_id = route.api_id(),
                "Every upstream attempt failed"
            ),
        }
        ctx.set_proxy_response(delivered.map(|d| d.reply));
    }
    route.plugins().run(Phase::Response, &mut ctx);

    let finished = ctx.finish();
    metrics::record_request(&method, finished.status_code, route.name(), started);
    metrics::record_response_bytes(finished.bytes_written);
    tracing::info!(
        request_id = %request_id,
        api_id = route.api_id(),
        method = %method,
        status = finished.status_code,
        bytes = finished.bytes_written,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request finished"
    );

    finished.writer.into_response()
}

fn reject_body(request_id: &str, method: &str, rejection: BytesRejection, started: Instant) -> Response {
    if let BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) = &rejection {
        tracing::warn!(request_id = %request_id, "Request body exceeded limit");
        metrics::record_request(method, 413, "none", started);
        return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
    }

    tracing::warn!(request_id = %request_id, error = %rejection, "Failed to read request body");
    let response = rejection.into_response();
    metrics::record_request(method, response.status().as_u16(), "none", started);
    response
}
