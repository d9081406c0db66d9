//! The queue service contract and its handle types.

use crate::error::QueueError;
use crate::message::{MessageId, QueueAddress, RawMessage};
use async_trait::async_trait;
use chrono::Duration;
use std::fmt;

/// Handle for a queue transaction opened with
/// [`QueueService::begin_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for a non-destructive read cursor created with
/// [`QueueService::create_cursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(u64);

impl CursorId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cursor positioning for peek operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeekMode {
    /// Read the message at the current cursor position without advancing
    Current,
    /// Advance the cursor one position, then read
    Next,
}

/// Contract for a synchronous, transaction-capable FIFO queue service.
///
/// "Queue does not exist" and "timeout" are distinct failure conditions
/// ([`QueueError::QueueNotFound`] vs [`QueueError::Timeout`]); callers depend
/// on telling them apart. Sends issued inside a transaction become visible
/// only at commit; receives are undone by abort, restoring messages at their
/// original positions with their original identifiers.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Open a new transaction
    async fn begin_transaction(&self) -> Result<TransactionId, QueueError>;

    /// Commit a transaction, applying its sends and finalizing its receives
    async fn commit(&self, transaction: TransactionId) -> Result<(), QueueError>;

    /// Abort a transaction, dropping its sends and restoring its receives
    async fn abort(&self, transaction: TransactionId) -> Result<(), QueueError>;

    /// Create a forward-only read cursor over a queue
    async fn create_cursor(&self, queue: &QueueAddress) -> Result<CursorId, QueueError>;

    /// Release a cursor
    async fn close_cursor(&self, cursor: CursorId) -> Result<(), QueueError>;

    /// Non-destructive read at the cursor position.
    ///
    /// Returns [`QueueError::Timeout`] when no message is available within
    /// the timeout.
    async fn peek(
        &self,
        queue: &QueueAddress,
        cursor: CursorId,
        mode: PeekMode,
        timeout: Duration,
    ) -> Result<RawMessage, QueueError>;

    /// Destructively receive the head message inside a transaction
    async fn receive(
        &self,
        queue: &QueueAddress,
        timeout: Duration,
        transaction: TransactionId,
    ) -> Result<RawMessage, QueueError>;

    /// Send a message inside a transaction.
    ///
    /// The service assigns a fresh identifier and enqueue timestamp; the
    /// assigned identifier is returned.
    async fn send(
        &self,
        queue: &QueueAddress,
        message: RawMessage,
        transaction: TransactionId,
    ) -> Result<MessageId, QueueError>;

    /// Destructively receive a specific message by identifier inside a
    /// transaction, regardless of its queue position
    async fn receive_by_id(
        &self,
        queue: &QueueAddress,
        id: &MessageId,
        transaction: TransactionId,
    ) -> Result<RawMessage, QueueError>;

    /// Check whether a queue exists
    async fn queue_exists(&self, queue: &QueueAddress) -> bool;
}
