//! Integration tests for health probes and the metrics endpoint.

use devauth_test_utils::TestDevAuthServer;
use reqwest::StatusCode;

// ============================================================================
// Liveness Probe Tests
// ============================================================================

/// The liveness probe returns 200 "OK" while the process serves HTTP.
#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;

    // Act
    let response = reqwest::get(format!("{}/health", server.url())).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// The liveness probe does not depend on the stores.
#[tokio::test]
async fn test_health_endpoint_ignores_store_outage() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server.devices().set_unavailable(true);
    server.tokens().set_unavailable(true);

    // Act
    let response = reqwest::get(format!("{}/health", server.url())).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

// ============================================================================
// Readiness Probe Tests
// ============================================================================

#[tokio::test]
async fn test_ready_endpoint_returns_ok_when_stores_answer() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;

    // Act
    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["device_registry"], "healthy");
    assert_eq!(body["token_store"], "healthy");

    Ok(())
}

/// A store outage takes the instance out of rotation without leaking the
/// underlying error.
#[tokio::test]
async fn test_ready_endpoint_returns_503_when_registry_unavailable() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server.devices().set_unavailable(true);

    // Act
    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["device_registry"], "unhealthy");
    assert_eq!(body["token_store"], "healthy");
    assert_eq!(body["error"], "Service dependencies unavailable");

    Ok(())
}

// ============================================================================
// Metrics Endpoint Tests
// ============================================================================

/// Requests served before a scrape show up in the Prometheus output.
#[tokio::test]
async fn test_metrics_endpoint_exposes_http_metrics() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    reqwest::get(format!("{}/health", server.url())).await?;

    // Act
    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await?;
    assert!(
        body.contains("devauth_http_requests_total"),
        "Expected HTTP request counter in metrics output"
    );

    Ok(())
}
