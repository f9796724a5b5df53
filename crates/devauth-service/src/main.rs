//! Device Authentication Service
//!
//! Entry point: loads configuration, connects the stores, and serves the
//! management, internal and operational HTTP APIs.

use devauth_service::config::Config;
use devauth_service::crypto::TokenCodec;
use devauth_service::observability::metrics::init_metrics_recorder;
use devauth_service::repositories::{PgDeviceRegistry, PgTokenStore};
use devauth_service::routes::{self, AppState};
use devauth_service::tasks::{start_token_cleanup, TokenCleanupConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Device Auth Service");

    // Install the recorder before anything records a metric
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        key_id = %config.key_id,
        issuer = %config.issuer,
        token_ttl_seconds = config.token_ttl_seconds,
        "Configuration loaded successfully"
    );

    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run database migrations: {}", e);
            e
        })?;

    info!("Database connection established");

    let codec = TokenCodec::new(config.signing_key_bytes(), &config.key_id, &config.issuer)
        .map_err(|e| {
            error!("Failed to initialize token codec: {}", e);
            e
        })?;

    let devices = Arc::new(PgDeviceRegistry::new(db_pool.clone()));
    let tokens = Arc::new(PgTokenStore::new(db_pool));
    let token_ttl = chrono::Duration::from_std(config.token_ttl()).map_err(|e| {
        error!("Invalid token TTL: {}", e);
        e
    })?;
    let state = Arc::new(AppState::new(
        Arc::new(codec),
        devices,
        tokens.clone(),
        token_ttl,
    ));

    // Background token cleanup, stopped after the server drains
    let cancel_token = CancellationToken::new();
    let cleanup_handle = tokio::spawn(start_token_cleanup(
        tokens,
        TokenCleanupConfig::from_config(&config),
        cancel_token.clone(),
    ));

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Device Auth Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(config.drain_seconds))
    .await?;

    cancel_token.cancel();
    if let Err(e) = cleanup_handle.await {
        warn!("Token cleanup task ended abnormally: {}", e);
    }

    info!("Device Auth Service shutdown complete");

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` controls filtering; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "devauth_service=debug,device_auth=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal(drain_secs: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DEVAUTH_DRAIN_SECONDS=0)");
    }
}
