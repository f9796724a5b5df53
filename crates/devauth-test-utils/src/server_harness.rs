//! Test server harness for E2E testing
//!
//! Provides [`TestDevAuthServer`] for spawning real device auth server
//! instances in tests, over in-memory stores by default or over PostgreSQL
//! stores for database-backed tests.

use crate::crypto_fixtures::test_codec;
use devauth_service::crypto::TokenCodec;
use devauth_service::models::{Device, DeviceStatus};
use devauth_service::observability::metrics::init_metrics_recorder;
use devauth_service::repositories::{
    DeviceRegistry, InMemoryDeviceRegistry, InMemoryTokenStore, PgDeviceRegistry, PgTokenStore,
    TokenStore,
};
use devauth_service::routes::{self, AppState};
use devauth_service::services::{IssuedToken, TokenIssuer};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Seed of the signing key every harness server uses.
pub const TEST_SIGNING_KEY_SEED: u8 = 1;

/// Lifetime of tokens issued by harness servers.
pub const TEST_TOKEN_TTL_SECONDS: i64 = 3600;

/// Only one global recorder may be installed per test process; later
/// servers share its handle.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the device auth server in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_verify_e2e() -> Result<(), anyhow::Error> {
///     let server = TestDevAuthServer::spawn().await?;
///     server.enroll_device("dev-1", DeviceStatus::Accepted).await?;
///     let issued = server.issue_token("dev-1").await?;
///
///     let response = reqwest::Client::new()
///         .post(format!("{}/api/internal/v1/devauth/tokens/verify", server.url()))
///         .bearer_auth(&issued.raw)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestDevAuthServer<D = InMemoryDeviceRegistry, T = InMemoryTokenStore> {
    addr: SocketAddr,
    devices: Arc<D>,
    tokens: Arc<T>,
    codec: Arc<TokenCodec>,
    issuer: TokenIssuer,
    _handle: JoinHandle<()>,
}

impl TestDevAuthServer {
    /// Spawn a server over fresh in-memory stores.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_stores(
            Arc::new(InMemoryDeviceRegistry::new()),
            Arc::new(InMemoryTokenStore::new()),
        )
        .await
    }
}

impl TestDevAuthServer<PgDeviceRegistry, PgTokenStore> {
    /// Spawn a server over PostgreSQL stores (typically a `#[sqlx::test]` pool).
    pub async fn spawn_with_pool(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::spawn_with_stores(
            Arc::new(PgDeviceRegistry::new(pool.clone())),
            Arc::new(PgTokenStore::new(pool)),
        )
        .await
    }
}

impl<D, T> TestDevAuthServer<D, T>
where
    D: DeviceRegistry + 'static,
    T: TokenStore + 'static,
{
    /// Spawn a server over the given stores.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Sign with the deterministic key for [`TEST_SIGNING_KEY_SEED`]
    /// - Start the HTTP server in the background
    pub async fn spawn_with_stores(devices: Arc<D>, tokens: Arc<T>) -> Result<Self, anyhow::Error> {
        let codec = Arc::new(
            test_codec(TEST_SIGNING_KEY_SEED)
                .map_err(|e| anyhow::anyhow!("Failed to build test codec: {}", e))?,
        );

        let state = Arc::new(AppState::new(
            codec.clone(),
            devices.clone(),
            tokens.clone(),
            chrono::Duration::seconds(TEST_TOKEN_TTL_SECONDS),
        ));
        let issuer = state.issuer.clone();

        // Build routes using the service's real route builder
        let app = routes::build_routes(state, metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            devices,
            tokens,
            codec,
            issuer,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The device registry behind the server
    pub fn devices(&self) -> &D {
        &self.devices
    }

    /// The token store behind the server
    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    /// The codec the server verifies with
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Enroll a device directly in the registry with the given status.
    pub async fn enroll_device(
        &self,
        device_id: &str,
        status: DeviceStatus,
    ) -> Result<Device, anyhow::Error> {
        self.devices.create(device_id).await?;
        self.devices
            .set_status(device_id, status)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Device vanished after enrollment"))
    }

    /// Issue a token for `device_id` through the server's own issuer.
    pub async fn issue_token(&self, device_id: &str) -> Result<IssuedToken, anyhow::Error> {
        Ok(self.issuer.issue(device_id).await?)
    }
}

impl<D, T> Drop for TestDevAuthServer<D, T> {
    fn drop(&mut self) {
        // Abort the HTTP server task so the port is released when the test ends
        self._handle.abort();
    }
}
