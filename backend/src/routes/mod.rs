//! Route definitions for TokenGate API

mod auth;

use axum::{routing::get, Router};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

pub use auth::{auth_routes, protected_routes};

/// Build the full application router with request tracing applied
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .merge(auth_routes())
        .merge(protected_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}

async fn root() -> &'static str {
    "TokenGate Auth Server"
}
