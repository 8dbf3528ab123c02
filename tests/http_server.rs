//! HTTP adapter driven by the shutdown manager.

use std::sync::Arc;
use std::time::Duration;

use shutdown_manager::config::HttpListenerConfig;
use shutdown_manager::http::{status_router, HttpServer};
use shutdown_manager::lifecycle::{Manager, ManagerConfig, Server, ServerError};
use shutdown_manager::observability::StopResult;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

mod common;

use common::RecordingMetrics;

async fn bind(name: &str) -> HttpServer {
    let config = HttpListenerConfig::new(name, "127.0.0.1:0");
    HttpServer::bind(&config, status_router(name)).await.unwrap()
}

#[tokio::test]
async fn serves_requests_until_cancelled() {
    let server = Arc::new(bind("public").await);
    let addr = server.local_addr();

    let metrics = RecordingMetrics::shared();
    let mut manager = Manager::new(
        ManagerConfig::new(Duration::from_secs(2)).with_metrics(metrics.clone()),
    );
    manager.add(server.clone());
    let manager = Arc::new(manager);

    let token = CancellationToken::new();
    let run = tokio::spawn({
        let manager = manager.clone();
        let token = token.clone();
        async move { manager.run(token).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    let status: serde_json::Value = client
        .get(format!("http://{addr}/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["name"], "public");
    assert_eq!(status["version"], env!("CARGO_PKG_VERSION"));

    token.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_ok(), "closed listener is a normal exit: {result:?}");
    assert_eq!(
        metrics.server_results(),
        vec![("public".to_string(), StopResult::Success)]
    );
    assert!(client.get(format!("http://{addr}/")).send().await.is_err());
}

#[tokio::test]
async fn graceful_stop_before_serve_closes_listener() {
    let server = bind("idle").await;
    let deadline = Instant::now() + Duration::from_secs(1);

    server.graceful_stop(deadline).await.unwrap();

    let result = server.serve(CancellationToken::new()).await;
    assert!(matches!(result, Err(ServerError::Closed)));
}

#[tokio::test]
async fn force_stop_is_idempotent_and_ends_serve() {
    let server = Arc::new(bind("forced").await);

    let serving = tokio::spawn({
        let server = server.clone();
        async move { server.serve(CancellationToken::new()).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    server.force_stop();
    server.force_stop();

    let result = tokio::time::timeout(Duration::from_secs(1), serving)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(ServerError::Closed)));
}

#[tokio::test]
async fn bind_conflict_is_io_error() {
    let first = bind("first").await;
    let config = HttpListenerConfig::new("second", first.local_addr().to_string());

    let err = match HttpServer::bind(&config, status_router("second")).await {
        Ok(_) => panic!("second bind on the same port should fail"),
        Err(err) => err,
    };
    assert!(matches!(err, ServerError::Io(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn graceful_stop_racing_serve_waits_for_listener_close() {
    for round in 0..20 {
        let server = Arc::new(bind("racing").await);
        let addr = server.local_addr();

        let serving = tokio::spawn({
            let server = server.clone();
            async move { server.serve(CancellationToken::new()).await }
        });
        let deadline = Instant::now() + Duration::from_secs(2);
        server.graceful_stop(deadline).await.unwrap();

        assert!(
            tokio::net::TcpStream::connect(addr).await.is_err(),
            "listener still open after graceful stop (round {round})"
        );

        let result = tokio::time::timeout(Duration::from_secs(1), serving)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ServerError::Closed)));
    }
}
