//! Error types for assessment-core.
//!
//! Extraction, grading and scheduling never fail; these errors only come out
//! of the configuration and JSON loaders.

use thiserror::Error;

/// Result type alias using AssessError.
pub type Result<T> = std::result::Result<T, AssessError>;

/// Errors raised while loading configuration or caller-supplied data.
#[derive(Debug, Error)]
pub enum AssessError {
    #[error("invalid config value for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    #[error("invalid value in environment variable {var}: {value}")]
    InvalidEnv { var: String, value: String },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
