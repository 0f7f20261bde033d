//! Error types for the conversation store.

use thiserror::Error;

/// Conversation store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be opened, the schema could not be created,
    /// or the store is not open.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// An insert failed.
    #[error("storage write failed: {0}")]
    Write(#[source] tokio_rusqlite::Error),
    /// A query failed.
    #[error("storage read failed: {0}")]
    Read(#[source] tokio_rusqlite::Error),
    /// A stored row could not be decoded into a message.
    #[error("invalid stored message: {0}")]
    InvalidRow(String),
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
