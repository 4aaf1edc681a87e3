//! Password hashing with bcrypt
//!
//! bcrypt is CPU-bound, so both hashing and verification run on tokio's blocking pool.

use thiserror::Error;
use tokio::sync::OnceCell;

/// bcrypt ignores every byte past this many
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Password hashing errors
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Hashing task failed: {0}")]
    Task(String),

    #[error("Password must be at most {} bytes", MAX_PASSWORD_BYTES)]
    TooLong,
}

impl From<bcrypt::BcryptError> for PasswordError {
    fn from(e: bcrypt::BcryptError) -> Self {
        PasswordError::Hashing(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PasswordError {
    fn from(e: tokio::task::JoinError) -> Self {
        PasswordError::Task(e.to_string())
    }
}

/// Salted, cost-bounded one-way password hasher
#[derive(Debug)]
pub struct PasswordHasher {
    cost: u32,
    /// Hash verified against when the account does not exist
    dummy_hash: OnceCell<String>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password
    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong);
        }
        let password = password.to_owned();
        let cost = self.cost;
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hashed)
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// Passwords longer than [`MAX_PASSWORD_BYTES`] never match, since bcrypt would
    /// only compare their prefix.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        let password = password.to_owned();
        let hash = hash.to_owned();
        let matches =
            tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        Ok(matches)
    }

    /// Spend the same work as a real verification, for unknown accounts.
    ///
    /// Keeps sign-in for a missing email about as slow as a wrong password.
    pub async fn verify_dummy(&self, password: &str) -> Result<(), PasswordError> {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.hash("tokengate-dummy-password"))
            .await?;
        self.verify(password, dummy).await?;
        Ok(())
    }
}
