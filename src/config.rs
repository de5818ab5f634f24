//! Account Service Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::AccountError;
use std::env;

/// Account and token configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Secret for signing access tokens (from ACCESS_TOKEN_SECRET env var)
    pub access_token_secret: String,

    /// Access token lifetime in seconds (from ACCESS_TOKEN_EXPIRY env var)
    pub access_token_expiry: i64,

    /// Secret for signing refresh tokens (from REFRESH_TOKEN_SECRET env var)
    pub refresh_token_secret: String,

    /// Refresh token lifetime in seconds (from REFRESH_TOKEN_EXPIRY env var)
    pub refresh_token_expiry: i64,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// JWT audience (from JWT_AUDIENCE env var)
    pub jwt_audience: String,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Mark token cookies `Secure` (from COOKIE_SECURE env var)
    pub cookie_secure: bool,

    /// Treat an existing full name as a registration conflict
    /// (from DUPLICATE_CHECK_FULL_NAME env var)
    pub duplicate_check_full_name: bool,

    /// Clear the refresh slot when a stale refresh token is presented
    /// (from REVOKE_ON_REFRESH_REUSE env var)
    pub revoke_on_refresh_reuse: bool,

    /// Largest accepted avatar upload in bytes (from AVATAR_MAX_BYTES env var)
    pub avatar_max_bytes: usize,
}

impl AccountConfig {
    /// Build a configuration with the given secrets and default settings
    pub fn new(
        access_token_secret: impl Into<String>,
        refresh_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            access_token_secret: access_token_secret.into(),
            access_token_expiry: 900, // 15 minutes
            refresh_token_secret: refresh_token_secret.into(),
            refresh_token_expiry: 864_000, // 10 days
            jwt_issuer: "rustpress-accounts".to_string(),
            jwt_audience: "rustpress-accounts-api".to_string(),
            argon2_memory_cost: 19_456, // 19 MiB
            argon2_time_cost: 2,
            argon2_parallelism: 1,
            cookie_secure: true,
            duplicate_check_full_name: false,
            revoke_on_refresh_reuse: true,
            avatar_max_bytes: 5 * 1024 * 1024,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AccountError> {
        let access_token_secret = required("ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = required("REFRESH_TOKEN_SECRET")?;
        let defaults = Self::new(access_token_secret, refresh_token_secret);

        Ok(Self {
            access_token_expiry: duration_var("ACCESS_TOKEN_EXPIRY")?
                .unwrap_or(defaults.access_token_expiry),

            refresh_token_expiry: duration_var("REFRESH_TOKEN_EXPIRY")?
                .unwrap_or(defaults.refresh_token_expiry),

            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| defaults.jwt_issuer.clone()),

            jwt_audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| defaults.jwt_audience.clone()),

            argon2_memory_cost: parsed_var("ARGON2_MEMORY_COST")?
                .unwrap_or(defaults.argon2_memory_cost),

            argon2_time_cost: parsed_var("ARGON2_TIME_COST")?
                .unwrap_or(defaults.argon2_time_cost),

            argon2_parallelism: parsed_var("ARGON2_PARALLELISM")?
                .unwrap_or(defaults.argon2_parallelism),

            cookie_secure: flag_var("COOKIE_SECURE")?.unwrap_or(defaults.cookie_secure),

            duplicate_check_full_name: flag_var("DUPLICATE_CHECK_FULL_NAME")?
                .unwrap_or(defaults.duplicate_check_full_name),

            revoke_on_refresh_reuse: flag_var("REVOKE_ON_REFRESH_REUSE")?
                .unwrap_or(defaults.revoke_on_refresh_reuse),

            avatar_max_bytes: parsed_var("AVATAR_MAX_BYTES")?
                .unwrap_or(defaults.avatar_max_bytes),

            ..defaults
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AccountError> {
        if self.access_token_secret.len() < 32 {
            return Err(AccountError::Config(
                "ACCESS_TOKEN_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.refresh_token_secret.len() < 32 {
            return Err(AccountError::Config(
                "REFRESH_TOKEN_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.access_token_secret == self.refresh_token_secret {
            return Err(AccountError::Config(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".to_string(),
            ));
        }

        if self.access_token_expiry <= 0 {
            return Err(AccountError::Config(
                "ACCESS_TOKEN_EXPIRY must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiry <= self.access_token_expiry {
            return Err(AccountError::Config(
                "REFRESH_TOKEN_EXPIRY must be greater than ACCESS_TOKEN_EXPIRY".to_string(),
            ));
        }

        if self.avatar_max_bytes == 0 {
            return Err(AccountError::Config(
                "AVATAR_MAX_BYTES must be positive".to_string(),
            ));
        }

        argon2::Params::new(
            self.argon2_memory_cost,
            self.argon2_time_cost,
            self.argon2_parallelism,
            None,
        )
        .map_err(|e| AccountError::Config(format!("Invalid ARGON2_* settings: {e}")))?;

        Ok(())
    }
}

/// Process-level settings for the HTTP binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_address: String,
    pub cors_origin: Option<String>,
    pub upload_dir: String,
    pub public_upload_url: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AccountError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "public/uploads".to_string()),
            public_upload_url: env::var("PUBLIC_UPLOAD_URL")
                .unwrap_or_else(|_| "/uploads".to_string()),
        })
    }
}

fn required(name: &str) -> Result<String, AccountError> {
    env::var(name)
        .map_err(|_| AccountError::Config(format!("{name} environment variable must be set")))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, AccountError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AccountError::Config(format!("{name} is not a valid number: {value}"))),
        Err(_) => Ok(None),
    }
}

fn flag_var(name: &str) -> Result<Option<bool>, AccountError> {
    match env::var(name) {
        Ok(value) => parse_flag(&value)
            .map(Some)
            .ok_or_else(|| AccountError::Config(format!("{name} is not a valid flag: {value}"))),
        Err(_) => Ok(None),
    }
}

fn duration_var(name: &str) -> Result<Option<i64>, AccountError> {
    match env::var(name) {
        Ok(value) => parse_duration(&value).map(Some).ok_or_else(|| {
            AccountError::Config(format!("{name} is not a valid duration: {value}"))
        }),
        Err(_) => Ok(None),
    }
}

/// Parse `true`/`false`, `1`/`0`, `yes`/`no` or `on`/`off`
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `"900"`, `"15m"`, `"12h"` or `"10d"` into seconds
pub fn parse_duration(value: &str) -> Option<i64> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&value[..idx], c.to_ascii_lowercase()),
        _ => (value, 's'),
    };

    let amount: i64 = digits.trim().parse().ok()?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        _ => return None,
    };

    amount.checked_mul(multiplier)
}
