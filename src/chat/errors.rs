//! Error types for the chat pipeline.

use thiserror::Error;

use crate::llm::ModelError;
use crate::store::StoreError;

/// Rejected inbound request. Never a system failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ValidationError {
    /// The body is not a JSON object.
    #[error("Invalid JSON body")]
    MalformedBody,
    /// The body exceeds the server's size limit.
    #[error("Request body too large")]
    BodyTooLarge,
    /// `threadId` or `content` is absent or falsy (`null`, `false`, `0`, `""`).
    #[error("Missing required fields: threadId and content are required")]
    MissingField,
    /// `threadId` or `content` is not a string.
    #[error("Invalid field types: threadId and content must be strings")]
    InvalidType,
    /// `content` is whitespace only.
    #[error("Content cannot be empty")]
    EmptyContent,
}

/// Failure of one chat turn.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request was rejected before any persistence.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The conversation store failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
    /// The model call failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
