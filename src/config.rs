use std::env;
use std::str::FromStr;

use chrono::Duration;

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
/// Upper bound for every configured lifetime and interval: one year.
pub const MAX_DURATION_SECS: i64 = 365 * 24 * 60 * 60;

/// Runtime settings, read once at startup and handed to [`crate::state::AppState`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` selects the in-memory stores.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    /// HMAC key used to sign bearer tokens.
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub session_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub bcrypt_cost: u32,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Config {
    /// A configuration with every default applied and the given signing secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            server_port: 8080,
            server_host: "127.0.0.1".to_string(),
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::hours(1),
            session_ttl: Duration::hours(24),
            session_sweep_interval: Duration::minutes(5),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::InternalServerError("JWT_SECRET must be set".into()))?;

        let mut config = Self::with_secret(jwt_secret);
        config.database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        config.server_host = env::var("SERVER_HOST").unwrap_or(config.server_host);
        config.server_port = parse_var("SERVER_PORT", config.server_port)?;
        config.token_ttl = seconds_var("TOKEN_TTL_SECS", config.token_ttl)?;
        config.session_ttl = seconds_var("SESSION_TTL_SECS", config.session_ttl)?;
        config.session_sweep_interval =
            seconds_var("SESSION_SWEEP_SECS", config.session_sweep_interval)?;
        config.bcrypt_cost = parse_var("BCRYPT_COST", config.bcrypt_cost)?;
        config.default_page_size = parse_var("DEFAULT_PAGE_SIZE", config.default_page_size)?;
        config.max_page_size = parse_var("MAX_PAGE_SIZE", config.max_page_size)?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(invalid("BCRYPT_COST must be between 4 and 31"));
        }
        for (name, value) in [
            ("TOKEN_TTL_SECS", self.token_ttl),
            ("SESSION_TTL_SECS", self.session_ttl),
            ("SESSION_SWEEP_SECS", self.session_sweep_interval),
        ] {
            if value <= Duration::zero() || value.num_seconds() > MAX_DURATION_SECS {
                return Err(out_of_range(name));
            }
        }
        if self.default_page_size == 0 || self.max_page_size < self.default_page_size {
            return Err(invalid(
                "DEFAULT_PAGE_SIZE must be positive and not exceed MAX_PAGE_SIZE",
            ));
        }
        Ok(())
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid(&format!("{} must be a number, got {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}

/// Reads a whole number of seconds, rejecting values `Duration::seconds` cannot hold
/// before they are converted.
fn seconds_var(name: &str, default: Duration) -> Result<Duration, AppError> {
    let secs: i64 = parse_var(name, default.num_seconds())?;
    if !(1..=MAX_DURATION_SECS).contains(&secs) {
        return Err(out_of_range(name));
    }
    Ok(Duration::seconds(secs))
}

fn out_of_range(name: &str) -> AppError {
    invalid(&format!(
        "{} must be between 1 and {} seconds",
        name, MAX_DURATION_SECS
    ))
}

fn invalid(msg: &str) -> AppError {
    AppError::InternalServerError(format!("Invalid configuration: {}", msg))
}
