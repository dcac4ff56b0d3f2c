use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Everything that can fail a job run. All variants are fatal.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("rate limit exhausted: {0}")]
    RateLimitExhausted(String),
    #[error("Twitter API error: {0}")]
    Api(String),
    #[error("no tweets fetched")]
    NoData,
    #[error("failed to write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
    #[error("failed to upload to S3: {0}")]
    Upload(String),
}

impl EtlError {
    /// Stable name of the error kind, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::RateLimitExhausted(_) => "RateLimitExhausted",
            Self::Api(_) => "ApiError",
            Self::NoData => "NoDataError",
            Self::Write { .. } => "WriteError",
            Self::Upload(_) => "UploadError",
        }
    }
}
