//! Error types for rule loading and batch processing.

use queue_drain_runtime::{QueueError, ValidationError};
use thiserror::Error;

/// Errors detected while building or initializing a rule set
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Header criteria and header reads require a key")]
    MissingHeaderKey,

    #[error("Unknown text encoding: {name}")]
    UnknownEncoding { name: String },

    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("At least one command is required")]
    NoCommands,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors surfaced by a processing run
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Rules(#[from] RuleError),
}
