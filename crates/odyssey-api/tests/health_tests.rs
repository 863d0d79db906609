//! Operational endpoint integration tests.
//!
//! Covers `/`, `/health`, `/ready`, `/metrics` and the JSON fallback using
//! the `TestOdysseyServer` harness.

use odyssey_test_utils::TestOdysseyServer;
use serde_json::{json, Value};

/// Test that the base route returns the exact identity payload.
#[tokio::test]
async fn test_root_returns_identity() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;

    let response = reqwest::get(format!("{}/", server.url())).await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(
        body,
        json!({
            "message": "This is the base url for the Odyssey REST API",
            "author": "Samuel Batchelor"
        })
    );

    Ok(())
}

/// Test that /health returns plain text "OK".
#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// Test that /ready reports the store and flips to 503 when it goes away.
#[tokio::test]
async fn test_ready_endpoint_tracks_store() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/ready", server.url())).send().await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"status": "ready", "store": "healthy"}));

    server
        .memory_store()
        .ok_or_else(|| anyhow::anyhow!("expected memory store"))?
        .set_offline(true);

    let response = client.get(format!("{}/ready", server.url())).send().await?;
    assert_eq!(response.status(), 503);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"status": "not_ready", "store": "unhealthy"}));

    Ok(())
}

/// Test that /metrics is public and answers in Prometheus text format.
#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

/// Test that unknown routes return a JSON 404.
#[tokio::test]
async fn test_unknown_route_returns_json_404() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;

    let response = reqwest::get(format!("{}/api/quasars", server.url())).await?;

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Route not found");

    Ok(())
}

/// Test that store failures surface as a sanitized 500.
#[tokio::test]
async fn test_store_failure_is_sanitized() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn_with(&[("PUBLIC_READS", "true")]).await?;
    server
        .memory_store()
        .ok_or_else(|| anyhow::anyhow!("expected memory store"))?
        .set_offline(true);

    let response = reqwest::get(format!("{}/api/galaxies", server.url())).await?;

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"message": "An internal error occurred"}));

    Ok(())
}
