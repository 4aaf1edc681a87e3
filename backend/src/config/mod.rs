//! Configuration management for TokenGate
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use thiserror::Error;

use crate::auth::{RefreshPolicy, RegistryWritePolicy};

/// Upper bounds for token lifetimes
const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;

/// Development fallback for `JWT_SECRET`; refused in production.
const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL (SQLite)
    pub database_url: String,

    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// JWT secret for token signing
    pub jwt_secret: String,

    /// Access token TTL in seconds (default: 900 = 15 minutes)
    pub jwt_access_token_ttl_seconds: i64,

    /// Refresh token TTL in days (default: 7)
    pub jwt_refresh_token_ttl_days: i64,

    /// bcrypt work factor (default: 12)
    pub bcrypt_cost: u32,

    /// Whether a refresh token must match the registry's active record
    pub refresh_require_registered: bool,

    /// What to do when writing the refresh token registry fails
    pub refresh_registry_writes: RegistryWritePolicy,

    /// How often expired refresh records are purged, in seconds
    pub refresh_purge_interval_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://auth.db".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .unwrap_or(5);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()))
            }
            _ => DEV_JWT_SECRET.to_string(),
        };

        let jwt_access_token_ttl_seconds = bounded(
            "JWT_ACCESS_TOKEN_TTL_SECONDS",
            env::var("JWT_ACCESS_TOKEN_TTL_SECONDS")
                .unwrap_or_else(|_| "900".to_string())
                .parse::<i64>()
                .unwrap_or(900),
            MAX_ACCESS_TOKEN_TTL_SECONDS,
        )?;

        let jwt_refresh_token_ttl_days = bounded(
            "JWT_REFRESH_TOKEN_TTL_DAYS",
            env::var("JWT_REFRESH_TOKEN_TTL_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse::<i64>()
                .unwrap_or(7),
            MAX_REFRESH_TOKEN_TTL_DAYS,
        )?;

        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(bcrypt::DEFAULT_COST);
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "BCRYPT_COST must be between 4 and 31, got {}",
                bcrypt_cost
            )));
        }

        let refresh_require_registered = env::var("REFRESH_REQUIRE_REGISTERED")
            .map(|s| parse_bool("REFRESH_REQUIRE_REGISTERED", &s))
            .unwrap_or(Ok(true))?;

        let refresh_registry_writes = env::var("REFRESH_REGISTRY_WRITES")
            .map(|s| parse_write_policy(&s))
            .unwrap_or(Ok(RegistryWritePolicy::BestEffort))?;

        let refresh_purge_interval_seconds = env::var("REFRESH_PURGE_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<u64>()
            .unwrap_or(3600)
            .max(1);

        Ok(Config {
            database_url,
            environment,
            port,
            db_max_connections,
            cors_allowed_origins,
            log_level,
            jwt_secret,
            jwt_access_token_ttl_seconds,
            jwt_refresh_token_ttl_days,
            bcrypt_cost,
            refresh_require_registered,
            refresh_registry_writes,
            refresh_purge_interval_seconds,
        })
    }

    /// Refresh handling policy derived from the configuration
    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            require_registered: self.refresh_require_registered,
            registry_writes: self.refresh_registry_writes,
        }
    }

    /// Database URL with any password masked, for logging
    pub fn database_url_masked(&self) -> String {
        if let Some(at_pos) = self.database_url.find('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                let prefix = &self.database_url[..colon_pos + 1];
                let suffix = &self.database_url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        self.database_url.clone()
    }
}

fn bounded(name: &str, value: i64, max: i64) -> Result<i64, ConfigError> {
    if value <= 0 || value > max {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be between 1 and {}, got {}",
            name, max, value
        )));
    }
    Ok(value)
}

fn parse_bool(name: &str, s: &str) -> Result<bool, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

fn parse_write_policy(s: &str) -> Result<RegistryWritePolicy, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "best_effort" | "best-effort" => Ok(RegistryWritePolicy::BestEffort),
        "strict" => Ok(RegistryWritePolicy::Strict),
        other => Err(ConfigError::InvalidValue(format!(
            "REFRESH_REGISTRY_WRITES must be 'best_effort' or 'strict', got '{}'",
            other
        ))),
    }
}
