//! JWT token generation and validation
//!
//! Handles creation and verification of access and refresh tokens. The engine owns no
//! persisted state: only the HMAC keys derived from the shared secret and a clock.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::clock::{Clock, SystemClock};

/// JWT-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Expected {expected} token, got {found} token")]
    WrongKind { expected: TokenKind, found: TokenKind },
}

impl JwtError {
    /// Message safe to show to clients.
    ///
    /// Signature, format and kind failures share one message so callers cannot probe
    /// which part of a forged token was rejected.
    pub fn public_message(&self) -> &'static str {
        match self {
            JwtError::Signing(_) => "Token could not be issued",
            JwtError::Expired => "Token has expired",
            JwtError::InvalidSignature | JwtError::Malformed(_) | JwtError::WrongKind { .. } => {
                "Invalid token"
            }
        }
    }
}

/// Token type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims carried by both access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Token type (access or refresh)
    pub token_type: TokenKind,
    /// JWT ID, unique per issued token
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// The identity the token was issued for
    pub fn identity(&self) -> &str {
        &self.sub
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Shared HMAC secret used to sign every token.
///
/// Built once from configuration and handed to [`TokenEngine::new`].
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self, JwtError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(JwtError::Signing("signing secret is empty".to_string()));
        }
        Ok(Self(secret))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(****)")
    }
}

/// Lifetimes of the two token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtls {
    pub access: Duration,
    pub refresh: Duration,
}

impl TokenTtls {
    pub fn new(access_ttl_seconds: i64, refresh_ttl_days: i64) -> Result<Self, JwtError> {
        let access = Duration::try_seconds(access_ttl_seconds).ok_or_else(|| {
            JwtError::Signing(format!(
                "access token lifetime of {}s is out of range",
                access_ttl_seconds
            ))
        })?;
        let refresh = Duration::try_days(refresh_ttl_days).ok_or_else(|| {
            JwtError::Signing(format!(
                "refresh token lifetime of {} days is out of range",
                refresh_ttl_days
            ))
        })?;

        Ok(Self { access, refresh })
    }
}

impl Default for TokenTtls {
    /// 15 minute access tokens, 7 day refresh tokens
    fn default() -> Self {
        Self {
            access: Duration::seconds(900),
            refresh: Duration::days(7),
        }
    }
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Issues and validates signed, time-limited tokens
#[derive(Clone)]
pub struct TokenEngine {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttls: TokenTtls,
    clock: Arc<dyn Clock>,
}

impl TokenEngine {
    /// Create an engine reading time from the system clock
    pub fn new(secret: &SigningSecret, ttls: TokenTtls) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the engine's clock after decoding.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttls,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttls(&self) -> TokenTtls {
        self.ttls
    }

    /// Current time according to the engine's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issue an access token and a refresh token for `identity`
    pub fn issue(&self, identity: &str) -> Result<TokenPair, JwtError> {
        if identity.is_empty() {
            return Err(JwtError::Signing("identity is empty".to_string()));
        }

        let now = self.clock.now();
        let (access_token, access_expires_at) =
            self.sign(identity, TokenKind::Access, now, self.ttls.access)?;
        let (refresh_token, refresh_expires_at) =
            self.sign(identity, TokenKind::Refresh, now, self.ttls.refresh)?;

        Ok(TokenPair {
            access_token,
            access_expires_at,
            refresh_token,
            refresh_expires_at,
        })
    }

    fn sign(
        &self,
        identity: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), JwtError> {
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            JwtError::Signing(format!("{} token expiry is out of range", kind))
        })?;
        if expires_at.timestamp() <= now.timestamp() {
            return Err(JwtError::Signing(format!(
                "{} token lifetime must be positive",
                kind
            )));
        }

        let claims = Claims {
            sub: identity.to_string(),
            token_type: kind,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))?;

        Ok((token, expires_at))
    }

    /// Verify the signature and expiry of a token of either kind
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Malformed(e.to_string()),
            })?;

        let claims = token_data.claims;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }

    /// Validate a token and require it to be of the given kind
    pub fn validate_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, JwtError> {
        let claims = self.validate(token)?;
        if claims.token_type != expected {
            return Err(JwtError::WrongKind {
                expected,
                found: claims.token_type,
            });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;

    fn engine(secret: &str) -> TokenEngine {
        TokenEngine::new(&SigningSecret::new(secret).unwrap(), TokenTtls::default())
    }

    fn swap_signature(token: &str, other: &str) -> String {
        let (head, _) = token.rsplit_once('.').unwrap();
        let (_, sig) = other.rsplit_once('.').unwrap();
        format!("{}.{}", head, sig)
    }

    #[test]
    fn test_issue_access_and_refresh_tokens() {
        let engine = engine("test-secret-key");
        let pair = engine.issue("alice@example.com").unwrap();
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());

        let access = engine.validate(&pair.access_token).unwrap();
        assert_eq!(access.identity(), "alice@example.com");
        assert_eq!(access.token_type, TokenKind::Access);
        assert_eq!(access.exp - access.iat, 900);

        let refresh = engine.validate(&pair.refresh_token).unwrap();
        assert_eq!(refresh.token_type, TokenKind::Refresh);
        assert_eq!(refresh.exp - refresh.iat, 604_800);
    }

    #[test]
    fn test_tokens_are_unique_per_issue() {
        let engine = engine("test-secret-key");
        let first = engine.issue("alice@example.com").unwrap();
        let second = engine.issue("alice@example.com").unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn test_invalid_token() {
        let engine = engine("test-secret-key");
        assert!(matches!(
            engine.validate("invalid.token.here"),
            Err(JwtError::Malformed(_))
        ));
        assert!(matches!(
            engine.validate("not-a-jwt"),
            Err(JwtError::Malformed(_))
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let token = engine("secret1")
            .issue("alice@example.com")
            .unwrap()
            .access_token;
        assert_eq!(
            engine("secret2").validate(&token),
            Err(JwtError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let engine = engine("test-secret-key");
        let alice = engine.issue("alice@example.com").unwrap().access_token;
        let mallory = engine.issue("mallory@example.com").unwrap().access_token;

        // Mallory's claims carrying Alice's signature
        let forged = swap_signature(&mallory, &alice);
        assert_eq!(engine.validate(&forged), Err(JwtError::InvalidSignature));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = engine("test-secret-key").with_clock(clock.clone());
        let pair = engine.issue("alice@example.com").unwrap();

        clock.advance(Duration::seconds(899));
        assert!(engine.validate(&pair.access_token).is_ok());

        clock.advance(Duration::seconds(2));
        assert_eq!(engine.validate(&pair.access_token), Err(JwtError::Expired));
        assert!(engine.validate(&pair.refresh_token).is_ok());
    }

    #[test]
    fn test_token_issued_in_the_past_is_expired() {
        let secret = SigningSecret::new("test-secret-key").unwrap();
        let past = Arc::new(ManualClock::starting_at(Utc::now() - Duration::days(8)));
        let old = TokenEngine::new(&secret, TokenTtls::default())
            .with_clock(past)
            .issue("alice@example.com")
            .unwrap();

        let engine = TokenEngine::new(&secret, TokenTtls::default());
        assert_eq!(engine.validate(&old.access_token), Err(JwtError::Expired));
        assert_eq!(engine.validate(&old.refresh_token), Err(JwtError::Expired));
    }

    #[test]
    fn test_validate_kind() {
        let engine = engine("test-secret-key");
        let pair = engine.issue("alice@example.com").unwrap();

        assert!(engine
            .validate_kind(&pair.refresh_token, TokenKind::Refresh)
            .is_ok());
        assert_eq!(
            engine.validate_kind(&pair.access_token, TokenKind::Refresh),
            Err(JwtError::WrongKind {
                expected: TokenKind::Refresh,
                found: TokenKind::Access,
            })
        );
    }

    #[test]
    fn test_public_messages_do_not_distinguish_forgery() {
        assert_eq!(
            JwtError::InvalidSignature.public_message(),
            JwtError::Malformed("bad".to_string()).public_message()
        );
        assert_ne!(
            JwtError::Expired.public_message(),
            JwtError::InvalidSignature.public_message()
        );
    }

    #[test]
    fn test_empty_secret_and_identity_rejected() {
        assert!(SigningSecret::new("").is_err());
        assert!(matches!(
            engine("test-secret-key").issue(""),
            Err(JwtError::Signing(_))
        ));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SigningSecret::new("super-secret").unwrap();
        assert!(!format!("{:?}", secret).contains("super-secret"));
    }

    #[test]
    fn test_out_of_range_ttls_are_errors() {
        assert!(TokenTtls::new(900, 7).is_ok());
        assert!(matches!(
            TokenTtls::new(900, 9_000_000_000_000),
            Err(JwtError::Signing(_))
        ));
        assert!(matches!(
            TokenTtls::new(i64::MAX, 7),
            Err(JwtError::Signing(_))
        ));
    }

    #[test]
    fn test_expiry_past_calendar_range_fails_to_issue() {
        let ttls = TokenTtls {
            access: Duration::seconds(900),
            refresh: Duration::days(365 * 1_000_000),
        };
        let engine = TokenEngine::new(&SigningSecret::new("secret").unwrap(), ttls);

        assert!(matches!(
            engine.issue("alice@example.com"),
            Err(JwtError::Signing(_))
        ));
    }
}
