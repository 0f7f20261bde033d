//! Error classification for model calls.

use thiserror::Error;

/// Classified failure of a model call.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The API rejected the configured credential.
    #[error("model credential rejected: {0}")]
    Auth(String),
    /// The account behind the credential has no quota left.
    #[error("model quota exhausted: {0}")]
    Quota(String),
    /// Any other failure, including transport errors and malformed replies.
    #[error("model call failed: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(value: reqwest::Error) -> Self {
        Self::Unknown(value.to_string())
    }
}

/// Convenience result alias for model calls.
pub type ModelResult<T> = Result<T, ModelError>;
