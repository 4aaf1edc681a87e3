//! Data models for TokenGate

use chrono::{DateTime, TimeZone, Utc};

pub mod auth;
pub use auth::*;

/// Registered user
///
/// Never serialized: the password hash must not leave the server.
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side record of the active refresh token for an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub email: String,
    /// SHA-256 hex digest of the refresh token
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// A record past its expiry is invalid even if it has not been purged yet
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Raw `refresh_tokens` row; expiry is stored as unix seconds
#[derive(Debug, sqlx::FromRow)]
pub struct RefreshTokenRow {
    pub email: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            email: row.email,
            token_hash: row.token_hash,
            expires_at: Utc
                .timestamp_opt(row.expires_at, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_record_expiry() {
        let now = Utc::now();
        let record = RefreshTokenRecord {
            email: "alice@example.com".to_string(),
            token_hash: "abc".to_string(),
            expires_at: now + Duration::seconds(10),
            created_at: now,
        };
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::seconds(10)));
    }

    #[test]
    fn test_row_conversion() {
        let now = Utc::now();
        let record: RefreshTokenRecord = RefreshTokenRow {
            email: "alice@example.com".to_string(),
            token_hash: "abc".to_string(),
            expires_at: 1_700_000_000,
            created_at: now,
        }
        .into();
        assert_eq!(record.expires_at.timestamp(), 1_700_000_000);
    }
}
