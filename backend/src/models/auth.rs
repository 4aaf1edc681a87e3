//! Authentication request/response DTOs

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::auth::MAX_PASSWORD_BYTES;

/// Sign-up request body
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(
        length(min = 1, message = "must not be empty"),
        custom = "within_bcrypt_limit"
    )]
    pub password: String,
}

/// bcrypt only reads the first 72 bytes; `length` counts characters
fn within_bcrypt_limit(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        let mut err = ValidationError::new("password_too_long");
        err.message = Some("must be at most 72 bytes".into());
        return Err(err);
    }
    Ok(())
}

/// Sign-in request body
#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub refresh_token: String,
}

/// Revoke token request
#[derive(Debug, Deserialize, Validate)]
pub struct RevokeTokenRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub refresh_token: String,
}

/// Auth tokens response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthTokensResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response of the protected endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ProtectedResponse {
    pub message: String,
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_validation() {
        let ok = SignUpRequest {
            email: "alice@example.com".to_string(),
            password: "secret123".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = SignUpRequest {
            email: "alice".to_string(),
            password: "secret123".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let long_password = SignUpRequest {
            email: "alice@example.com".to_string(),
            password: "x".repeat(73),
        };
        assert!(long_password.validate().is_err());
    }

    #[test]
    fn test_password_limit_counts_bytes() {
        // 72 characters but 108 bytes
        let multibyte = SignUpRequest {
            email: "alice@example.com".to_string(),
            password: format!("{}{}", "é".repeat(36), "A".repeat(36)),
        };
        assert!(multibyte.validate().is_err());

        let at_limit = SignUpRequest {
            email: "alice@example.com".to_string(),
            password: "x".repeat(72),
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_refresh_request_requires_token() {
        let empty = RefreshTokenRequest {
            refresh_token: String::new(),
        };
        assert!(empty.validate().is_err());
    }
}
