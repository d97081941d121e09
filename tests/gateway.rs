//! End-to-end tests through a real listener and real mock backends.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use plugin_gateway::config::GatewayConfig;

mod common;

use common::{api, client, dead_address, start_gateway, start_mock_backend, start_programmable_backend, MockReply};

#[tokio::test]
async fn test_proxies_status_headers_and_body() {
    let backend = start_mock_backend(
        MockReply::new(201, "created").header("Content-Type", "text/plain"),
    )
    .await;

    let mut config = GatewayConfig::default();
    config.apis.push(api(1, "/", &[backend]));
    let (addr, shutdown) = start_gateway(config).await;

    let res = client()
        .post(format!("http://{}/items", addr))
        .body("payload")
        .send()
        .await
        .expect("Gateway unreachable");

    assert_eq!(res.status(), 201);
    assert_eq!(res.headers()["content-type"], "text/plain");
    assert_eq!(res.headers()["content-length"], "7");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "created");

    shutdown.trigger();
}

#[tokio::test]
async fn test_header_tiers_survive_ingestion() {
    let backend = start_mock_backend(
        MockReply::new(200, "ok")
            .header("Server", "backend")
            .header("X-Trace", "upstream"),
    )
    .await;

    let mut config = GatewayConfig::default();
    let mut entry = api(1, "/", &[backend]);
    entry.headers.add.insert("x-trace".into(), "abc".into());
    entry.headers.set.insert("server".into(), "gateway".into());
    entry.headers.set.insert("x-fixed".into(), "yes".into());
    config.apis.push(entry);
    let (addr, shutdown) = start_gateway(config).await;

    let res = client().get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let servers: Vec<_> = res.headers().get_all("server").iter().collect();
    assert_eq!(servers, ["gateway"]);
    let traces: Vec<_> = res.headers().get_all("x-trace").iter().collect();
    assert_eq!(traces, ["upstream", "abc"]);
    assert_eq!(res.headers()["x-fixed"], "yes");

    shutdown.trigger();
}

#[tokio::test]
async fn test_proxy_request_rewrite_reaches_upstream() {
    let backend = start_programmable_backend(|seen| async move {
        let body = format!(
            "{} {} key={}",
            seen.method,
            seen.target,
            seen.header("x-api-key").unwrap_or("-")
        );
        MockReply::new(200, body)
    })
    .await;

    let mut config = GatewayConfig::default();
    let mut entry = api(1, "/public", &[backend]);
    entry.strip_prefix = true;
    entry.target_url = "/internal".into();
    entry.target_method = Some("PUT".into());
    entry.headers.proxy_set.insert("x-api-key".into(), "secret".into());
    config.apis.push(entry);
    let (addr, shutdown) = start_gateway(config).await;

    let res = client()
        .get(format!("http://{}/public/users?page=2", addr))
        .header("x-api-key", "client-value")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "PUT /internal/users?page=2 key=secret");

    shutdown.trigger();
}

#[tokio::test]
async fn test_retry_reaches_second_target() {
    let dead = dead_address().await;
    let live = start_mock_backend(MockReply::new(200, "second")).await;

    let mut config = GatewayConfig::default();
    let mut entry = api(1, "/", &[dead, live]);
    entry.retry_count = 1;
    config.apis.push(entry);
    let (addr, shutdown) = start_gateway(config).await;

    let res = client().get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "second");

    shutdown.trigger();
}

#[tokio::test]
async fn test_retry_count_bounds_attempts() {
    let dead = dead_address().await;
    let live = start_mock_backend(MockReply::new(200, "second")).await;

    let mut config = GatewayConfig::default();
    config.apis.push(api(1, "/", &[dead, live]));
    let (addr, shutdown) = start_gateway(config).await;

    let res = client().get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(res.status(), 504);
    assert_eq!(res.headers()["content-length"], "0");

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_error_status_is_not_retried() {
    let failing = start_mock_backend(MockReply::new(503, "busy")).await;
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let spare = start_programmable_backend(move |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            MockReply::new(200, "spare")
        }
    })
    .await;

    let mut config = GatewayConfig::default();
    let mut entry = api(1, "/", &[failing, spare]);
    entry.retry_count = 1;
    config.apis.push(entry);
    let (addr, shutdown) = start_gateway(config).await;

    let res = client().get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "busy");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_path_is_404() {
    let backend = start_mock_backend(MockReply::new(200, "ok")).await;

    let mut config = GatewayConfig::default();
    config.apis.push(api(1, "/only", &[backend]));
    let (addr, shutdown) = start_gateway(config).await;

    let res = client().get(format!("http://{}/elsewhere", addr)).send().await.unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_client_request_id_propagated() {
    let backend = start_programmable_backend(|seen| async move {
        MockReply::new(200, seen.header("x-request-id").unwrap_or("missing").to_string())
    })
    .await;

    let mut config = GatewayConfig::default();
    config.apis.push(api(1, "/", &[backend]));
    let (addr, shutdown) = start_gateway(config).await;

    let res = client()
        .get(format!("http://{}/", addr))
        .header("x-request-id", "trace-42")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-request-id"], "trace-42");
    assert_eq!(res.text().await.unwrap(), "trace-42");

    shutdown.trigger();
}
