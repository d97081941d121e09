//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use plugin_gateway::config::{ApiConfig, GatewayConfig, HeaderRewriteConfig};
use plugin_gateway::{GatewayServer, Shutdown};

/// What a mock backend answers with.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// The head of a request a mock backend received.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let _ = serve_one(socket, f.as_ref()).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock backend that always returns the same reply.
pub async fn start_mock_backend(reply: MockReply) -> SocketAddr {
    start_programmable_backend(move |_| {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

async fn serve_one<F, Fut>(mut socket: TcpStream, f: &F) -> std::io::Result<()>
where
    F: Fn(SeenRequest) -> Fut,
    Fut: Future<Output = MockReply>,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let seen = parse_head(&String::from_utf8_lossy(&buf));

    // Drain the body so closing the socket does not reset the connection.
    let head_len = buf.windows(4).position(|w| w == b"\r\n\r\n").unwrap_or(0) + 4;
    let body_len: usize = seen
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut received = buf.len() - head_len;
    while received < body_len {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        received += n;
    }

    let reply = f(seen).await;
    let reason = StatusCode::from_u16(reply.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");

    let mut response = format!("HTTP/1.1 {} {}\r\n", reply.status, reason);
    for (name, value) in &reply.headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.body.len(),
        reply.body
    ));

    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}

fn parse_head(raw: &str) -> SeenRequest {
    let mut lines = raw.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers = lines
        .take_while(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();
    SeenRequest {
        method,
        target,
        headers,
    }
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// An API with defaults for everything but id, prefix and targets.
pub fn api(api_id: u64, path_prefix: &str, targets: &[SocketAddr]) -> ApiConfig {
    ApiConfig {
        api_id,
        name: format!("api-{}", api_id),
        strategy_id: "default".into(),
        strategy_name: "default".into(),
        host: None,
        path_prefix: path_prefix.into(),
        method: None,
        target_servers: targets.iter().map(ToString::to_string).collect(),
        target_url: String::new(),
        target_method: None,
        strip_prefix: false,
        strip_slash: false,
        retry_count: 0,
        timeout_ms: Some(2000),
        priority: 0,
        headers: HeaderRewriteConfig::default(),
    }
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(mut config: GatewayConfig) -> (SocketAddr, Shutdown) {
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GatewayServer::new(config).unwrap();
    let shutdown = Shutdown::new();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
