//! Store failure scenarios.
//!
//! A failed cascading revocation must not fail the status update, and must
//! not make the device's tokens verify.

use devauth_service::models::DeviceStatus;
use devauth_service::repositories::TokenStore;
use devauth_test_utils::{TestDevAuthServer, TestTokenBuilder, TEST_DEVICE_ID_1, TEST_JTI_1};
use reqwest::StatusCode;
use serde_json::json;

/// The cascade fails, the status write stands, and the still-unrevoked token
/// is refused because its device is no longer accepted.
#[tokio::test]
async fn test_cascade_failure_still_returns_204() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    let token = TestTokenBuilder::new().with_jti(TEST_JTI_1);
    server.tokens().insert(token.record()).await;
    server.tokens().set_fail_bulk_revocation(true);
    let client = reqwest::Client::new();

    // Act
    let response = client
        .put(format!(
            "{}/api/management/v1/devauth/devices/{}/status",
            server.url(),
            TEST_DEVICE_ID_1
        ))
        .json(&json!({ "status": "rejected" }))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(server.tokens().bulk_revocation_count(), 1);

    let record = server.tokens().get(TEST_JTI_1).await?;
    assert_eq!(record.map(|t| t.revoked), Some(false));

    let verify = client
        .post(format!(
            "{}/api/internal/v1/devauth/tokens/verify",
            server.url()
        ))
        .bearer_auth(token.sign(server.codec())?)
        .send()
        .await?;
    assert_eq!(verify.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

/// The cascade failure is visible to operators through metrics.
#[tokio::test]
async fn test_cascade_failure_is_counted() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    server.tokens().set_fail_bulk_revocation(true);

    // Act
    reqwest::Client::new()
        .put(format!(
            "{}/api/management/v1/devauth/devices/{}/status",
            server.url(),
            TEST_DEVICE_ID_1
        ))
        .json(&json!({ "status": "pending" }))
        .send()
        .await?;

    // Assert
    let metrics = reqwest::get(format!("{}/metrics", server.url()))
        .await?
        .text()
        .await?;
    assert!(
        metrics.contains("devauth_cascade_failures_total"),
        "Expected cascade failure counter in metrics output"
    );

    Ok(())
}

/// With both stores down, readiness fails and the liveness probe stays up.
#[tokio::test]
async fn test_store_outage_flips_readiness_only() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server.devices().set_unavailable(true);
    server.tokens().set_unavailable(true);

    // Act
    let ready = reqwest::get(format!("{}/ready", server.url())).await?;
    let health = reqwest::get(format!("{}/health", server.url())).await?;

    // Assert
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health.status(), StatusCode::OK);
    let body: serde_json::Value = ready.json().await?;
    assert_eq!(body["device_registry"], "unhealthy");
    assert_eq!(body["token_store"], "unhealthy");

    Ok(())
}

/// Recovery is picked up without restarting the server.
#[tokio::test]
async fn test_readiness_recovers_after_outage() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server.tokens().set_unavailable(true);
    let down = reqwest::get(format!("{}/ready", server.url())).await?;

    // Act
    server.tokens().set_unavailable(false);
    let up = reqwest::get(format!("{}/ready", server.url())).await?;

    // Assert
    assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(up.status(), StatusCode::OK);

    Ok(())
}
