//! Middleware for TokenGate API
//!
//! This module provides request tracing, the authentication gate and
//! validated JSON extraction.

pub mod auth;
mod json;
mod tracing;

pub use auth::AuthenticatedUser;
pub use json::ValidatedJson;
pub use tracing::request_tracing;
