//! Error types for segment chain operations.

use std::time::Duration;

use common::StorageError;

/// Errors returned by [`SegmentChain`](crate::SegmentChain).
///
/// Backend conflicts never appear here; they are resolved inside the append
/// loop. Everything else from the store is surfaced unchanged as
/// [`Error::Storage`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The segment store failed a request.
    #[error("storage error: {0}")]
    Storage(String),

    /// The configured attempt limit was reached before any segment accepted the payload.
    #[error("append not accepted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// The append did not complete within its deadline.
    #[error("append deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// The caller cancelled the append.
    #[error("append cancelled")]
    Cancelled,

    /// A name or configuration value was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The chain reached a state it should never be in.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Storage(msg) => Error::Storage(msg),
            StorageError::Internal(msg) => Error::Internal(msg),
        }
    }
}

/// Result type alias for segment chain operations.
pub type Result<T> = std::result::Result<T, Error>;
