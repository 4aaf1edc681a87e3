//! Health check handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::db::Database;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}

/// GET /health - Report service and database status
pub async fn health_check(State(database): State<Database>) -> Json<HealthResponse> {
    let (status, database) = if database.is_healthy().await {
        ("healthy", "connected")
    } else {
        ("unhealthy", "unreachable")
    };

    Json(HealthResponse {
        status: status.to_string(),
        database: database.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
