//! Integration tests for POST /api/internal/v1/devauth/tokens/verify.
//!
//! Outcomes map to 200 (valid), 401 (invalid), 403 (expired) and 400 for a
//! missing or malformed Authorization header.

use devauth_service::models::DeviceStatus;
use devauth_test_utils::{
    test_codec, ErrorBodyAssertions, TestDevAuthServer, TestTokenBuilder, TokenAssertions,
    TEST_DEVICE_ID_1, TEST_DEVICE_ID_2, TEST_JTI_1, TEST_JTI_2, TEST_KEY_ID,
};
use reqwest::StatusCode;

fn verify_url(server: &TestDevAuthServer) -> String {
    format!("{}/api/internal/v1/devauth/tokens/verify", server.url())
}

async fn verify(server: &TestDevAuthServer, raw: &str) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .post(verify_url(server))
        .bearer_auth(raw)
        .send()
        .await?)
}

// ============================================================================
// Valid Tokens
// ============================================================================

/// A token issued through the real issuance path verifies while its device
/// is accepted.
#[tokio::test]
async fn test_verify_issued_token_for_accepted_device() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    let issued = server.issue_token(TEST_DEVICE_ID_1).await?;

    issued
        .raw
        .assert_valid_jwt()
        .assert_for_device(TEST_DEVICE_ID_1)
        .assert_has_jti(&issued.record.jti)
        .assert_signed_by(TEST_KEY_ID)
        .assert_expires_in(3600);

    // Act
    let response = verify(&server, &issued.raw).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

/// Verification is read-only: repeating it changes nothing.
#[tokio::test]
async fn test_verify_is_repeatable() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    let token = TestTokenBuilder::new();
    server.tokens().insert(token.record()).await;
    let raw = token.sign(server.codec())?;

    // Act
    let responses = futures::future::join_all((0..8).map(|_| verify(&server, &raw))).await;

    // Assert
    for response in responses {
        assert_eq!(response?.status(), StatusCode::OK);
    }
    assert_eq!(server.tokens().len().await, 1);

    Ok(())
}

// ============================================================================
// Invalid Tokens
// ============================================================================

#[tokio::test]
async fn test_verify_revoked_token_returns_401() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    let token = TestTokenBuilder::new().revoked();
    server.tokens().insert(token.record()).await;

    // Act
    let response = verify(&server, &token.sign(server.codec())?).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("www-authenticate"));
    let body: serde_json::Value = response.json().await?;
    body.assert_error_code("INVALID_TOKEN")
        .assert_message_contains("revoked");

    Ok(())
}

/// A well-signed token with no stored record is unknown.
#[tokio::test]
async fn test_verify_unknown_token_returns_401() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    let raw = TestTokenBuilder::new().sign(server.codec())?;

    // Act
    let response = verify(&server, &raw).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    body.assert_error_code("INVALID_TOKEN");

    Ok(())
}

/// Tokens of pending and rejected devices are refused.
#[tokio::test]
async fn test_verify_token_of_unaccepted_device_returns_401() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    let token = TestTokenBuilder::new();
    server.tokens().insert(token.record()).await;
    let raw = token.sign(server.codec())?;

    for status in [DeviceStatus::Pending, DeviceStatus::Rejected] {
        server.enroll_device(TEST_DEVICE_ID_1, status).await?;

        // Act
        let response = verify(&server, &raw).await?;

        // Assert
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} device must not verify",
            status
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_verify_token_of_missing_device_returns_401() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    let token = TestTokenBuilder::new().for_device(TEST_DEVICE_ID_2);
    server.tokens().insert(token.record()).await;

    // Act
    let response = verify(&server, &token.sign(server.codec())?).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

/// A record that names another device than the signed subject is refused.
#[tokio::test]
async fn test_verify_subject_mismatch_returns_401() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    server
        .enroll_device(TEST_DEVICE_ID_2, DeviceStatus::Accepted)
        .await?;
    let stored = TestTokenBuilder::new().for_device(TEST_DEVICE_ID_2);
    server.tokens().insert(stored.record()).await;
    let raw = TestTokenBuilder::new()
        .for_device(TEST_DEVICE_ID_1)
        .sign(server.codec())?;

    // Act
    let response = verify(&server, &raw).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

/// Malformed tokens are refused without any store lookup.
#[tokio::test]
async fn test_verify_malformed_token_never_touches_stores() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    let foreign_codec = test_codec(99)?;
    let forged = TestTokenBuilder::new().sign(&foreign_codec)?;
    let wrong_issuer = TestTokenBuilder::new()
        .issued_by("someone-else")
        .sign(server.codec())?;
    let oversized = "a".repeat(5000);
    let device_lookups = server.devices().lookup_count();

    for raw in ["not-a-token", "a.b.c", forged.as_str(), wrong_issuer.as_str(), oversized.as_str()] {
        // Act
        let response = verify(&server, raw).await?;

        // Assert
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json().await?;
        body.assert_error_code("INVALID_TOKEN");
    }

    assert_eq!(server.tokens().lookup_count(), 0);
    assert_eq!(server.devices().lookup_count(), device_lookups);

    Ok(())
}

// ============================================================================
// Expired Tokens
// ============================================================================

/// Expiry is a distinct outcome asking the device to apply for a new token.
#[tokio::test]
async fn test_verify_expired_token_returns_403() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    let token = TestTokenBuilder::new()
        .with_jti(TEST_JTI_2)
        .expired_seconds_ago(60);
    server.tokens().insert(token.record()).await;

    // Act
    let response = verify(&server, &token.sign(server.codec())?).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await?;
    body.assert_error_code("TOKEN_EXPIRED")
        .assert_message_contains("apply for a new one");

    Ok(())
}

/// Revocation outranks expiry.
#[tokio::test]
async fn test_verify_expired_and_revoked_token_returns_401() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    let token = TestTokenBuilder::new()
        .with_jti(TEST_JTI_1)
        .expired_seconds_ago(60)
        .revoked();
    server.tokens().insert(token.record()).await;

    // Act
    let response = verify(&server, &token.sign(server.codec())?).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

// ============================================================================
// Authorization Header Handling
// ============================================================================

#[tokio::test]
async fn test_verify_without_authorization_header_returns_400() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;

    // Act
    let response = reqwest::Client::new()
        .post(verify_url(&server))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    body.assert_error_code("BAD_REQUEST")
        .assert_message_contains("Missing Authorization header");

    Ok(())
}

#[tokio::test]
async fn test_verify_with_non_bearer_scheme_returns_400() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;

    for value in ["Basic dXNlcjpwYXNz", "Bearer", "Token abc"] {
        // Act
        let response = reqwest::Client::new()
            .post(verify_url(&server))
            .header("authorization", value)
            .send()
            .await?;

        // Assert
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "{:?} should be rejected",
            value
        );
    }

    assert_eq!(server.tokens().lookup_count(), 0);

    Ok(())
}

// ============================================================================
// Store Failures
// ============================================================================

/// A store failure during verification is an internal error, never a verdict.
#[tokio::test]
async fn test_verify_with_token_store_down_returns_500() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestDevAuthServer::spawn().await?;
    server
        .enroll_device(TEST_DEVICE_ID_1, DeviceStatus::Accepted)
        .await?;
    let token = TestTokenBuilder::new();
    server.tokens().insert(token.record()).await;
    server.tokens().set_unavailable(true);

    // Act
    let response = verify(&server, &token.sign(server.codec())?).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await?;
    body.assert_error_code("DATABASE_ERROR");

    Ok(())
}
