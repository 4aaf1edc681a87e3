//! TokenGate Auth Server
//!
//! Serves sign-up, sign-in, token refresh and revocation over HTTP, backed by SQLite.

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use tokengate_server::auth::{AuthService, PasswordHasher, SigningSecret, TokenEngine, TokenTtls};
use tokengate_server::config::Config;
use tokengate_server::db::{self, Database};
use tokengate_server::routes;
use tokengate_server::state::AppState;
use tokengate_server::store::{SqliteCredentialStore, SqliteRefreshTokenRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting TokenGate");

    let db_pool = db::create_pool(&config).await?;
    db::run_migrations(&db_pool).await?;

    let secret = SigningSecret::new(config.jwt_secret.clone())?;
    let tokens = TokenEngine::new(
        &secret,
        TokenTtls::new(
            config.jwt_access_token_ttl_seconds,
            config.jwt_refresh_token_ttl_days,
        )?,
    );

    let auth_service = Arc::new(AuthService::new(
        Arc::new(SqliteCredentialStore::new(db_pool.clone())),
        Arc::new(SqliteRefreshTokenRegistry::new(db_pool.clone())),
        tokens,
        PasswordHasher::new(config.bcrypt_cost),
        config.refresh_policy(),
    ));

    // Periodically drop refresh records that have expired
    let purge_service = auth_service.clone();
    let purge_every = Duration::from_secs(config.refresh_purge_interval_seconds);
    tokio::spawn(async move {
        tracing::info!("Refresh token purge task started");
        let mut interval = tokio::time::interval(purge_every);
        loop {
            interval.tick().await;
            match purge_service.purge_expired_refresh_tokens().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Purged expired refresh tokens"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired refresh tokens"),
            }
        }
    });

    let app_state = AppState::new(auth_service, Database::new(db_pool));

    let app = routes::app_router(app_state).layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins_str = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins_str.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
