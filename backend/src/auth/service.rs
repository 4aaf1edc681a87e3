//! Authentication service
//!
//! Core business logic for sign-up, sign-in, token refresh and revocation.

use std::sync::Arc;
use thiserror::Error;

use crate::models::User;
use crate::store::{CredentialStore, RefreshTokenRegistry, StoreError};

use super::jwt::{Claims, JwtError, TokenEngine, TokenKind, TokenPair};
use super::password::{PasswordError, PasswordHasher};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email already exists")]
    DuplicateIdentity,

    /// Unknown email and wrong password are deliberately the same error
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Access token has expired")]
    AccessTokenExpired,

    #[error("Invalid access token")]
    Unauthenticated,

    #[error("{0}")]
    InvalidPassword(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateIdentity => AuthError::DuplicateIdentity,
            StoreError::Database(msg) => AuthError::Internal(format!("storage: {}", msg)),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::TooLong => AuthError::InvalidPassword(e.to_string()),
            _ => AuthError::Internal(e.to_string()),
        }
    }
}

/// How failures to write the refresh token registry are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistryWritePolicy {
    /// Log the failure and still hand out the tokens, with a warning attached
    #[default]
    BestEffort,
    /// Fail the whole operation
    Strict,
}

/// Refresh token handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Only accept refresh tokens that are the identity's active registry record.
    ///
    /// When false, a validly signed, unexpired refresh token is enough, including
    /// one that was already rotated away or revoked.
    pub require_registered: bool,
    pub registry_writes: RegistryWritePolicy,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            require_registered: true,
            registry_writes: RegistryWritePolicy::BestEffort,
        }
    }
}

/// Tokens handed out by sign-in or refresh
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub tokens: TokenPair,
    /// Set when the registry write failed under [`RegistryWritePolicy::BestEffort`].
    /// The refresh token is then unknown to the registry.
    pub registry_warning: Option<String>,
}

/// Authentication service
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    registry: Arc<dyn RefreshTokenRegistry>,
    tokens: TokenEngine,
    hasher: PasswordHasher,
    policy: RefreshPolicy,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        registry: Arc<dyn RefreshTokenRegistry>,
        tokens: TokenEngine,
        hasher: PasswordHasher,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            credentials,
            registry,
            tokens,
            hasher,
            policy,
        }
    }

    /// Register a new user
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let password_hash = self.hasher.hash(password).await?;
        let user = self.credentials.create(email, &password_hash).await?;

        tracing::info!(user_id = user.id, "User signed up");

        Ok(user)
    }

    /// Verify credentials and issue a token pair
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedTokens, AuthError> {
        let Some(user) = self.credentials.find_by_email(email).await? else {
            self.hasher.verify_dummy(password).await?;
            tracing::debug!("Sign-in rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        // A stored hash bcrypt cannot parse is treated as a mismatch, not a fault.
        let matches = self
            .hasher
            .verify(password, &user.password_hash)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(user_id = user.id, error = %e, "Stored password hash unreadable");
                false
            });
        if !matches {
            tracing::debug!(user_id = user.id, "Sign-in rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue(&user.email)?;
        let registry_warning = self
            .write_registry(
                self.registry
                    .record(&user.email, &tokens.refresh_token, tokens.refresh_expires_at)
                    .await,
            )?;

        tracing::info!(user_id = user.id, "User signed in");

        Ok(IssuedTokens {
            tokens,
            registry_warning,
        })
    }

    /// Exchange a refresh token for a new pair, rotating the registry entry
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens, AuthError> {
        let claims = self
            .tokens
            .validate_kind(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh rejected: token invalid");
                AuthError::InvalidRefreshToken
            })?;

        if self.policy.require_registered {
            let record = self.registry.find(refresh_token).await?;
            let active = record
                .filter(|r| r.email == claims.sub && !r.is_expired(self.tokens.now()));
            if active.is_none() {
                tracing::debug!("Refresh rejected: token is not the active registry record");
                return Err(AuthError::InvalidRefreshToken);
            }
        }

        let tokens = self.issue(&claims.sub)?;
        let registry_warning = self
            .write_registry(
                self.registry
                    .rotate(&claims.sub, &tokens.refresh_token, tokens.refresh_expires_at)
                    .await,
            )?;

        tracing::info!("Refresh token rotated");

        Ok(IssuedTokens {
            tokens,
            registry_warning,
        })
    }

    /// Revoke a refresh token. Unknown tokens are not an error.
    pub async fn revoke_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.registry.revoke(refresh_token).await?;
        Ok(())
    }

    /// Validate an access token presented to a protected operation
    pub fn authenticate(&self, access_token: &str) -> Result<Claims, AuthError> {
        self.tokens
            .validate_kind(access_token, TokenKind::Access)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                match e {
                    JwtError::Expired => AuthError::AccessTokenExpired,
                    _ => AuthError::Unauthenticated,
                }
            })
    }

    /// Drop refresh records that are past their expiry
    pub async fn purge_expired_refresh_tokens(&self) -> Result<u64, AuthError> {
        let purged = self.registry.purge_expired(self.tokens.now()).await?;
        Ok(purged)
    }

    /// Access token lifetime in seconds (the `expires_in` of responses)
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.tokens.ttls().access.num_seconds()
    }

    fn issue(&self, email: &str) -> Result<TokenPair, AuthError> {
        self.tokens
            .issue(email)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    fn write_registry(&self, result: Result<(), StoreError>) -> Result<Option<String>, AuthError> {
        match (result, self.policy.registry_writes) {
            (Ok(()), _) => Ok(None),
            (Err(e), RegistryWritePolicy::BestEffort) => {
                tracing::warn!(error = %e, "Failed to store refresh token; continuing");
                Ok(Some(e.to_string()))
            }
            (Err(e), RegistryWritePolicy::Strict) => Err(e.into()),
        }
    }
}
