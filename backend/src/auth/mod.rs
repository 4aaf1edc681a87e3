//! Authentication module for TokenGate
//!
//! Provides email/password authentication.
//! - bcrypt password hashing
//! - JWT access/refresh token generation and validation
//! - Refresh token rotation and revocation through a server-side registry

mod clock;
mod jwt;
mod password;
mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use jwt::{Claims, JwtError, SigningSecret, TokenEngine, TokenKind, TokenPair, TokenTtls};
pub use password::{PasswordError, PasswordHasher, MAX_PASSWORD_BYTES};
pub use service::{AuthError, AuthService, IssuedTokens, RefreshPolicy, RegistryWritePolicy};
