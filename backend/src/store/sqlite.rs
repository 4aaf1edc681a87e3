//! sqlx/SQLite implementations of the storage traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{hash_token, CredentialStore, RefreshTokenRegistry, StoreError};
use crate::models::{RefreshTokenRecord, RefreshTokenRow, User};

/// `users` table access
#[derive(Clone)]
pub struct SqliteCredentialStore {
    db_pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let created_at = Utc::now();

        // The UNIQUE constraint on email arbitrates concurrent sign-ups.
        let id = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(created_at)
        .execute(&self.db_pool)
        .await?
        .last_insert_rowid();

        Ok(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(user)
    }
}

/// `refresh_tokens` table access
#[derive(Clone)]
pub struct SqliteRefreshTokenRegistry {
    db_pool: SqlitePool,
}

impl SqliteRefreshTokenRegistry {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl RefreshTokenRegistry for SqliteRefreshTokenRegistry {
    async fn record(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, email, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (email) DO UPDATE SET
                token_hash = excluded.token_hash,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at
            "#,
        )
        .bind(hash_token(token))
        .bind(email)
        .bind(expires_at.timestamp())
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM refresh_tokens WHERE token_hash = ?
            "#,
        )
        .bind(hash_token(token))
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        tracing::debug!(rows_affected, "Refresh token revocation applied");

        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT email, token_hash, expires_at, created_at
            FROM refresh_tokens
            WHERE token_hash = ?
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM refresh_tokens WHERE expires_at <= ?
            "#,
        )
        .bind(now.timestamp())
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}
