//! Error types for queue operations.

use chrono::Duration;
use thiserror::Error;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

/// Comprehensive error type for all queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue not found: {queue}")]
    QueueNotFound { queue: String },

    #[error("Read timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Message not found: {id}")]
    MessageNotFound { id: String },

    #[error("Transaction {id} not found or already closed")]
    TransactionNotFound { id: u64 },

    #[error("Cursor {id} not found or already closed")]
    CursorNotFound { id: u64 },

    #[error("Queue service failure: {message}")]
    ServiceFailure { message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl QueueError {
    /// Check whether this is the transient-empty condition: nothing to read
    /// right now, which ends the current batch but is not an error.
    pub fn is_no_message(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check whether this error is recoverable at the per-message level.
    ///
    /// Recoverable conditions (timeout, missing queue, missing message) never
    /// abort a run; everything else is a fatal queue-service failure that
    /// must unwind the processing loop.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::QueueNotFound { .. } => true,
            Self::MessageNotFound { .. } => true,
            Self::TransactionNotFound { .. } => false,
            Self::CursorNotFound { .. } => false,
            Self::ServiceFailure { .. } => false,
            Self::Validation(_) => false,
        }
    }
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}
