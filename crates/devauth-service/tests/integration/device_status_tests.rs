//! Integration tests for the device management endpoints.
//!
//! - PUT /api/management/v1/devauth/devices/:id/status
//! - GET /api/management/v1/devauth/devices/:id

use devauth_service::models::DeviceStatus;
use devauth_service::repositories::DeviceRegistry;
use devauth_test_utils::{
    ErrorBodyAssertions, TestDevAuthServer, TEST_DEVICE_ID_1, TEST_DEVICE_ID_UNKNOWN,
};
use reqwest::StatusCode;
use serde_json::json;

fn status_url(server: &TestDevAuthServer, device_id: &str) -> String {
    format!(
        "{}/api/management/v1/devauth/devices/{}/status",
        server.url(),
        device_id
    )
}

fn device_url(server: &TestDevAuthServer, device_id: &str) -> String {
    format!(
        "{}/api/management/v1/devauth/devices/{}",
        server.url(),
        device_id
    )
}

// ============================================================================
// Status Update Tests
// ============================================================================

/// Every status value is accepted from every starting status.
#[tokio::test]
async fn test_update_status_allows_every_transition() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    for from in DeviceStatus::ALL {
        for to in DeviceStatus::ALL {
            server.enroll_device(TEST_DEVICE_ID_1, from).await?;

            // Act
            let response = client
                .put(status_url(&server, TEST_DEVICE_ID_1))
                .json(&json!({ "status": to.as_str() }))
                .send()
                .await?;

            // Assert
            assert_eq!(
                response.status(),
                StatusCode::NO_CONTENT,
                "{} -> {} should succeed",
                from,
                to
            );
            let device = server.devices().get(TEST_DEVICE_ID_1).await?;
            assert_eq!(device.map(|d| d.status), Some(to));
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_update_status_unknown_device_returns_404() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;

    // Act
    let response = reqwest::Client::new()
        .put(status_url(&server, TEST_DEVICE_ID_UNKNOWN))
        .json(&json!({ "status": "accepted" }))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await?;
    body.assert_error_code("NOT_FOUND");

    // The registry never creates devices implicitly
    assert!(server.devices().get(TEST_DEVICE_ID_UNKNOWN).await?.is_none());

    Ok(())
}

/// Unknown status values are rejected before the registry is touched.
#[tokio::test]
async fn test_update_status_rejects_unknown_status() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;

    for status in ["revoked", "ACCEPTED", ""] {
        // Act
        let response = reqwest::Client::new()
            .put(status_url(&server, TEST_DEVICE_ID_1))
            .json(&json!({ "status": status }))
            .send()
            .await?;

        // Assert
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "status {:?} should be rejected",
            status
        );
        let body: serde_json::Value = response.json().await?;
        body.assert_error_code("BAD_REQUEST");
    }

    let device = server.devices().get(TEST_DEVICE_ID_1).await?;
    assert_eq!(device.map(|d| d.status), Some(DeviceStatus::Accepted));

    Ok(())
}

#[tokio::test]
async fn test_update_status_rejects_malformed_body() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Pending)
        .await?;
    let client = reqwest::Client::new();

    // Act
    let not_json = client
        .put(status_url(&server, TEST_DEVICE_ID_1))
        .header("content-type", "application/json")
        .body("status=accepted")
        .send()
        .await?;
    let missing_field = client
        .put(status_url(&server, TEST_DEVICE_ID_1))
        .json(&json!({ "state": "accepted" }))
        .send()
        .await?;

    // Assert
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
    assert_eq!(missing_field.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = missing_field.json().await?;
    body.assert_error_code("BAD_REQUEST");

    Ok(())
}

/// A store failure is reported as a generic 500; details stay in the logs.
#[tokio::test]
async fn test_update_status_registry_failure_returns_500() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Pending)
        .await?;
    server.devices().set_unavailable(true);

    // Act
    let response = reqwest::Client::new()
        .put(status_url(&server, TEST_DEVICE_ID_1))
        .json(&json!({ "status": "accepted" }))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await?;
    body.assert_error_code("DATABASE_ERROR")
        .assert_message_contains("internal");

    Ok(())
}

// ============================================================================
// Request Id Tests
// ============================================================================

/// Error bodies carry the caller's request id, also echoed as a header.
#[tokio::test]
async fn test_error_body_echoes_caller_request_id() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;

    // Act
    let response = reqwest::Client::new()
        .put(status_url(&server, TEST_DEVICE_ID_UNKNOWN))
        .header("x-request-id", "req-operator-42")
        .json(&json!({ "status": "rejected" }))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-operator-42")
    );
    let body: serde_json::Value = response.json().await?;
    body.assert_request_id("req-operator-42");

    Ok(())
}

/// Without a caller id the server generates one and uses it consistently.
#[tokio::test]
async fn test_error_body_carries_generated_request_id() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;

    // Act
    let response = reqwest::Client::new()
        .get(device_url(&server, TEST_DEVICE_ID_UNKNOWN))
        .send()
        .await?;

    // Assert
    let header_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Response lacks x-request-id"))?;
    assert!(!header_id.is_empty());
    let body: serde_json::Value = response.json().await?;
    body.assert_request_id(&header_id);

    Ok(())
}

// ============================================================================
// Get Device Tests
// ============================================================================

#[tokio::test]
async fn test_get_device_returns_current_status() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Rejected)
        .await?;

    // Act
    let response = reqwest::get(device_url(&server, TEST_DEVICE_ID_1)).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["id"], TEST_DEVICE_ID_1);
    assert_eq!(body["status"], "rejected");

    Ok(())
}

#[tokio::test]
async fn test_get_device_unknown_returns_404() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;

    // Act
    let response = reqwest::get(device_url(&server, TEST_DEVICE_ID_UNKNOWN)).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
