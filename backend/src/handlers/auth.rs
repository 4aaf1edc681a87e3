//! Authentication HTTP handlers
//!
//! Endpoints for email/password authentication.

use axum::{extract::State, http::StatusCode, Json};

use super::AuthenticatedUser;
use crate::auth::IssuedTokens;
use crate::error::ApiError;
use crate::middleware::ValidatedJson;
use crate::models::{
    AuthTokensResponse, MessageResponse, ProtectedResponse, RefreshTokenRequest,
    RevokeTokenRequest, SignInRequest, SignUpRequest,
};
use crate::state::AppState;

/// POST /auth/signup - Register a new user
pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignUpRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    state.auth_service.sign_up(&req.email, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User signed up successfully")),
    ))
}

/// POST /auth/signin - Verify credentials and issue tokens
pub async fn sign_in(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignInRequest>,
) -> Result<Json<AuthTokensResponse>, ApiError> {
    let issued = state.auth_service.sign_in(&req.email, &req.password).await?;

    Ok(Json(tokens_response(&state, issued)))
}

/// POST /auth/refresh - Exchange a refresh token for a new token pair
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<AuthTokensResponse>, ApiError> {
    let issued = state.auth_service.refresh(&req.refresh_token).await?;

    Ok(Json(tokens_response(&state, issued)))
}

/// POST /auth/revoke - Invalidate a refresh token
pub async fn revoke_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RevokeTokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth_service.revoke_token(&req.refresh_token).await?;

    Ok(Json(MessageResponse::new("Token revoked successfully")))
}

/// GET /protected - Example endpoint behind the authentication gate
pub async fn protected(user: AuthenticatedUser) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "Welcome to the protected endpoint".to_string(),
        user: user.email,
    })
}

fn tokens_response(state: &AppState, issued: IssuedTokens) -> AuthTokensResponse {
    // `registry_warning` is logged by the service and left out of the response.
    AuthTokensResponse {
        access_token: issued.tokens.access_token,
        refresh_token: issued.tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.auth_service.access_token_ttl_seconds(),
    }
}
