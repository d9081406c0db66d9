//! # Queue-Drain Runtime
//!
//! Transactional queue service layer for queue-drain: the message model,
//! queue addressing, the error taxonomy shared by every queue operation, and
//! the [`service::QueueService`] contract that the processing engine drives.
//!
//! This library provides:
//! - Validated queue names and `name@server` addressing
//! - The raw wire message (identifier, correlation id, label, body bytes,
//!   extension blob, enqueue timestamp)
//! - Transaction and cursor handles with begin/commit/abort semantics
//! - A fully functional in-memory transactional FIFO service used by tests
//!   and for local development
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Message structures, identifiers, and addressing
//! - [`service`] - The queue service trait and its handle types
//! - [`memory`] - In-memory transactional queue service

pub mod error;
pub mod memory;
pub mod message;
pub mod service;

// Re-export commonly used types at crate root for convenience
pub use error::{QueueError, ValidationError};
pub use memory::InMemoryQueueService;
pub use message::{MessageId, QueueAddress, QueueName, RawMessage, Timestamp};
pub use service::{CursorId, PeekMode, QueueService, TransactionId};

#[cfg(any(test, feature = "test-util"))]
pub use service::MockQueueService;
