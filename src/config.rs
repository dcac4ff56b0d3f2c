use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{OUTPUT_PATH, S3_BUCKET, S3_KEY, TARGET_COUNT, TARGET_USERNAME};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential: {0}")]
    MissingCredential(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Job configuration loaded from environment variables.
///
/// The account, post count and output destination are fixed; only transport
/// and retry tuning come from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    // Twitter API
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub username: String,
    pub count: i64,

    // Fetch retries
    pub max_retries: u32,
    pub initial_wait: Duration,
    pub rate_limit_precheck: bool,

    // Output
    pub output_path: PathBuf,

    // S3 Storage
    pub s3_bucket: String,
    pub s3_key: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.twitter.com".to_string(),
            http_timeout: Duration::from_secs(30),
            username: TARGET_USERNAME.to_string(),
            count: TARGET_COUNT,
            max_retries: 3,
            initial_wait: Duration::from_secs(60),
            rate_limit_precheck: true,
            output_path: PathBuf::from(OUTPUT_PATH),
            s3_bucket: S3_BUCKET.to_string(),
            s3_key: S3_KEY.to_string(),
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            // Twitter API
            api_base_url: env_or_default("TWITTER_API_BASE_URL", &defaults.api_base_url),
            http_timeout: Duration::from_secs(parse_env_u64(
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),

            // Fetch retries
            max_retries: parse_env_u32("FETCH_MAX_RETRIES", defaults.max_retries)?,
            initial_wait: Duration::from_secs(parse_env_u64(
                "FETCH_INITIAL_WAIT_SECS",
                defaults.initial_wait.as_secs(),
            )?),
            rate_limit_precheck: parse_env_bool("RATE_LIMIT_PRECHECK", defaults.rate_limit_precheck)?,

            // S3 Storage
            s3_region: env_or_default("S3_REGION", &defaults.s3_region),
            s3_endpoint: optional_env("S3_ENDPOINT"),

            ..defaults
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.api_base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "TWITTER_API_BASE_URL".to_string(),
                message: format!("not a valid URL: '{}'", self.api_base_url),
            });
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_MAX_RETRIES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.s3_region.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "S3_REGION".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}
