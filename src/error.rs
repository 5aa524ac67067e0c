//! Error types for CDR call reconstruction.
//!
//! Reconstruction itself never fails: a correlation group that cannot yield a
//! call is a [`RejectReason`](crate::builder::RejectReason), not an error.
//! [`CdrError`] covers the edges of the engine instead:
//!
//! - **Input errors** ([`CdrError::is_input_error`]): leg rows, dates or
//!   directory payloads that could not be understood.
//! - **Runtime conditions**: the worker pool could not start, or the batch
//!   was cancelled before every group was processed.

use thiserror::Error;

/// Result type alias for CDR operations
pub type CdrResult<T> = Result<T, CdrError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CdrError {
    /// IO error while reading leg or directory files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON leg row or directory payload
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Call date matching none of the accepted layouts
    #[error("Unrecognized date format: {value}")]
    InvalidTimestamp { value: String },

    /// Directory payload lacking the expected sections
    #[error("Invalid directory payload: {message}")]
    InvalidDirectory { message: String },

    /// Worker pool could not be created
    #[error("Failed to build worker pool: {message}")]
    ThreadPool { message: String },

    /// Batch abandoned through its cancel handle
    #[error("Batch cancelled after {completed} of {total} groups")]
    Cancelled { completed: usize, total: usize },
}

impl CdrError {
    pub fn invalid_timestamp(value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
        }
    }

    pub fn invalid_directory(message: impl Into<String>) -> Self {
        Self::InvalidDirectory {
            message: message.into(),
        }
    }

    /// `true` if the error comes from data handed to the engine rather than
    /// from the engine's own execution.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CdrError::Io(_)
                | CdrError::Json(_)
                | CdrError::InvalidTimestamp { .. }
                | CdrError::InvalidDirectory { .. }
        )
    }
}
