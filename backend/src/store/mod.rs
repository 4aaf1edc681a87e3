//! Persistence seams for users and refresh tokens
//!
//! The auth service only talks to these traits; [`sqlite`] provides the sqlx-backed
//! implementations used by the server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{RefreshTokenRecord, User};

pub mod sqlite;

pub use sqlite::{SqliteCredentialStore, SqliteRefreshTokenRegistry};

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Email already exists")]
    DuplicateIdentity,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateIdentity
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// User persistence with a uniqueness constraint on email
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new user; fails with [`StoreError::DuplicateIdentity`] if the email is taken
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    /// Look up a user; a missing user is `Ok(None)`, not an error
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Server-side tracking of the single active refresh token per identity
#[async_trait]
pub trait RefreshTokenRegistry: Send + Sync {
    /// Upsert the active refresh token for `email`, replacing any previous one
    async fn record(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Replace the active token after a successful refresh
    async fn rotate(
        &self,
        email: &str,
        new_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.record(email, new_token, new_expires_at).await
    }

    /// Delete the record for `token`. Deleting an unknown token succeeds.
    async fn revoke(&self, token: &str) -> Result<(), StoreError>;

    /// Find the record for `token`, expired or not
    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Delete every record that expired at or before `now`, returning how many went
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Hash a token for storage
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
