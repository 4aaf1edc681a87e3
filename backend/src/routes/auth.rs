//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/auth/revoke", post(auth::revoke_token))
}

/// Routes behind the authentication gate
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/protected", get(auth::protected))
}
