use std::env;
use std::time::Duration;

use crate::retry::RetryPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Outbound email API settings
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

/// Cloudinary credentials, only ever used server side
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub email: EmailConfig,
    pub cloudinary: CloudinaryConfig,
    pub code_save_retry: RetryPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_attempts = parse_or("CODE_SAVE_MAX_ATTEMPTS", 3u32)?;
        let delay_ms = parse_or("CODE_SAVE_RETRY_DELAY_MS", 1000u64)?;
        let code_save_retry = retry_policy(
            env::var("CODE_SAVE_BACKOFF").ok().as_deref(),
            max_attempts,
            Duration::from_millis(delay_ms),
        )?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: parse_or("PORT", 9500u16)?,
            email: EmailConfig {
                api_url: env::var("EMAIL_API_URL").unwrap_or_default(),
                api_key: env::var("EMAIL_API_KEY").unwrap_or_default(),
                from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "\"منصة المشاريع\" <no-reply@gradtrack.app>".to_string()),
            },
            cloudinary: CloudinaryConfig {
                cloud_name: env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
                api_key: env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
                api_secret: env::var("CLOUDINARY_API_SECRET").unwrap_or_default(),
            },
            code_save_retry,
        })
    }
}

/// `fixed` (default) waits `delay` between attempts; `exponential` doubles it
/// each time, capped at ten times the base delay.
fn retry_policy(
    backoff: Option<&str>,
    max_attempts: u32,
    delay: Duration,
) -> Result<RetryPolicy, ConfigError> {
    match backoff.map(str::trim) {
        None | Some("") | Some("fixed") => Ok(RetryPolicy::fixed(max_attempts, delay)),
        Some("exponential") => Ok(RetryPolicy::exponential(max_attempts, delay, delay * 10)),
        Some(other) => Err(ConfigError::Invalid("CODE_SAVE_BACKOFF", other.to_string())),
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}
