//! Queue access strategies.
//!
//! A strategy owns the transactional protocol for one drain run: how
//! messages are read from the source, how terminal actions remove them, and
//! how an unprocessed message is handed back. Two protocols exist:
//!
//! - [`CursorStrategy`] reads non-destructively through a cursor and removes
//!   messages by identifier inside a write-only transaction. A message that
//!   matched nothing is simply left where it is.
//! - [`ReceiveStrategy`] reads destructively inside a per-batch transaction
//!   and re-appends messages that must survive the run. Returned messages
//!   move to the tail and come back with fresh identifiers.

use crate::error::ProcessError;
use async_trait::async_trait;
use chrono::Duration;
use queue_drain_runtime::{
    CursorId, MessageId, PeekMode, QueueAddress, QueueError, QueueService, RawMessage,
    TransactionId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;

/// How long a single read waits for a message before the batch ends
const READ_TIMEOUT: Duration = Duration::milliseconds(1);

/// Which access protocol a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    Cursor,
    Receive,
}

/// The transactional protocol driving one drain run.
///
/// Calls arrive in a fixed shape: `begin_batch`, then reads and per-message
/// operations, then either `commit_batch` or `undo_get_next`, and finally
/// `release` exactly once.
#[async_trait]
pub trait QueueAccessStrategy: Send {
    /// Start a new batch
    async fn begin_batch(&mut self) -> Result<(), QueueError>;

    /// Make the batch's work permanent
    async fn commit_batch(&mut self) -> Result<(), QueueError>;

    /// Read the next message. `None` means the source is out of messages
    /// (empty or missing); the run ends normally.
    async fn get_next(&mut self) -> Result<Option<RawMessage>, QueueError>;

    /// Send a message to a destination within the batch
    async fn send(
        &mut self,
        destination: &QueueAddress,
        message: RawMessage,
    ) -> Result<(), QueueError>;

    /// Remove a message from the source within the batch
    async fn delete(&mut self, id: &MessageId) -> Result<(), QueueError>;

    /// Hand back a message that matched no terminal action
    async fn return_message(&mut self, message: RawMessage) -> Result<(), QueueError>;

    /// Undo the most recent read: the message must stay on the source,
    /// unprocessed, and the batch ends
    async fn undo_get_next(&mut self, message: RawMessage) -> Result<(), QueueError>;

    /// Tear down cursors and any still-open transaction
    async fn release(&mut self) -> Result<(), QueueError>;
}

/// Build the strategy for `kind` over `source`
pub async fn create_strategy(
    kind: StrategyKind,
    service: Arc<dyn QueueService>,
    source: QueueAddress,
) -> Result<Box<dyn QueueAccessStrategy>, ProcessError> {
    let strategy: Box<dyn QueueAccessStrategy> = match kind {
        StrategyKind::Cursor => Box::new(CursorStrategy::new(service, source).await?),
        StrategyKind::Receive => Box::new(ReceiveStrategy::new(service, source)),
    };
    Ok(strategy)
}

// ============================================================================
// CursorStrategy
// ============================================================================

/// Cursor-based access: non-destructive peeks, with sends and deletes
/// carried by a write-only transaction per batch.
pub struct CursorStrategy {
    service: Arc<dyn QueueService>,
    source: QueueAddress,
    cursor: CursorId,
    peek_mode: PeekMode,
    write_transaction: Option<TransactionId>,
}

impl CursorStrategy {
    /// Open a cursor over `source`
    pub async fn new(
        service: Arc<dyn QueueService>,
        source: QueueAddress,
    ) -> Result<Self, QueueError> {
        let cursor = service.create_cursor(&source).await?;
        Ok(Self {
            service,
            source,
            cursor,
            peek_mode: PeekMode::Current,
            write_transaction: None,
        })
    }

    fn transaction(&self) -> Result<TransactionId, QueueError> {
        self.write_transaction.ok_or(QueueError::ServiceFailure {
            message: "no batch in progress".to_string(),
        })
    }
}

#[async_trait]
impl QueueAccessStrategy for CursorStrategy {
    async fn begin_batch(&mut self) -> Result<(), QueueError> {
        self.write_transaction = Some(self.service.begin_transaction().await?);
        Ok(())
    }

    async fn commit_batch(&mut self) -> Result<(), QueueError> {
        if let Some(txn) = self.write_transaction.take() {
            self.service.commit(txn).await?;
        }
        Ok(())
    }

    async fn get_next(&mut self) -> Result<Option<RawMessage>, QueueError> {
        let result = self
            .service
            .peek(&self.source, self.cursor, self.peek_mode, READ_TIMEOUT)
            .await;
        match result {
            Ok(message) => {
                self.peek_mode = PeekMode::Next;
                Ok(Some(message))
            }
            Err(err) if err.is_no_message() => Ok(None),
            Err(QueueError::QueueNotFound { queue }) => {
                error!(queue = %queue, "source queue does not exist");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn send(
        &mut self,
        destination: &QueueAddress,
        message: RawMessage,
    ) -> Result<(), QueueError> {
        let txn = self.transaction()?;
        self.service.send(destination, message, txn).await?;
        Ok(())
    }

    async fn delete(&mut self, id: &MessageId) -> Result<(), QueueError> {
        let txn = self.transaction()?;
        match self.service.receive_by_id(&self.source, id, txn).await {
            Ok(_) => Ok(()),
            // Someone else consumed it since the peek; nothing left to remove.
            Err(QueueError::MessageNotFound { id }) => {
                warn!(message_id = %id, "message to delete no longer on the queue");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn return_message(&mut self, _message: RawMessage) -> Result<(), QueueError> {
        // Peeks never removed it; the message is still on the queue.
        Ok(())
    }

    async fn undo_get_next(&mut self, _message: RawMessage) -> Result<(), QueueError> {
        Ok(())
    }

    async fn release(&mut self) -> Result<(), QueueError> {
        if let Some(txn) = self.write_transaction.take() {
            self.service.abort(txn).await?;
        }
        self.service.close_cursor(self.cursor).await
    }
}

// ============================================================================
// ReceiveStrategy
// ============================================================================

/// Receive-based access: one transaction per batch, destructive reads, and
/// explicit re-append for messages that must survive.
pub struct ReceiveStrategy {
    service: Arc<dyn QueueService>,
    source: QueueAddress,
    transaction: Option<TransactionId>,
    /// Whether the open transaction carries sends that a plain abort would lose
    has_payload: bool,
}

impl ReceiveStrategy {
    pub fn new(service: Arc<dyn QueueService>, source: QueueAddress) -> Self {
        Self {
            service,
            source,
            transaction: None,
            has_payload: false,
        }
    }

    fn transaction(&self) -> Result<TransactionId, QueueError> {
        self.transaction.ok_or(QueueError::ServiceFailure {
            message: "no batch in progress".to_string(),
        })
    }
}

#[async_trait]
impl QueueAccessStrategy for ReceiveStrategy {
    async fn begin_batch(&mut self) -> Result<(), QueueError> {
        self.transaction = Some(self.service.begin_transaction().await?);
        self.has_payload = false;
        Ok(())
    }

    async fn commit_batch(&mut self) -> Result<(), QueueError> {
        if let Some(txn) = self.transaction.take() {
            self.service.commit(txn).await?;
        }
        self.has_payload = false;
        Ok(())
    }

    async fn get_next(&mut self) -> Result<Option<RawMessage>, QueueError> {
        let txn = self.transaction()?;
        match self.service.receive(&self.source, READ_TIMEOUT, txn).await {
            Ok(message) => Ok(Some(message)),
            Err(err) if err.is_no_message() => Ok(None),
            Err(QueueError::QueueNotFound { queue }) => {
                error!(queue = %queue, "source queue does not exist");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn send(
        &mut self,
        destination: &QueueAddress,
        message: RawMessage,
    ) -> Result<(), QueueError> {
        let txn = self.transaction()?;
        self.service.send(destination, message, txn).await?;
        self.has_payload = true;
        Ok(())
    }

    async fn delete(&mut self, _id: &MessageId) -> Result<(), QueueError> {
        // The receive already took the message off the queue; committing the
        // batch makes the removal permanent.
        Ok(())
    }

    async fn return_message(&mut self, message: RawMessage) -> Result<(), QueueError> {
        let txn = self.transaction()?;
        self.service.send(&self.source, message, txn).await?;
        self.has_payload = true;
        Ok(())
    }

    async fn undo_get_next(&mut self, message: RawMessage) -> Result<(), QueueError> {
        let txn = self.transaction()?;
        if self.has_payload {
            // Earlier work in this transaction must not be rolled back, so
            // the message goes back via a send and the batch commits. It
            // lands at the tail with a fresh identifier.
            self.service.send(&self.source, message, txn).await?;
            self.service.commit(txn).await?;
        } else {
            // Nothing sent yet; aborting restores the message at its
            // original position with its original identifier.
            self.service.abort(txn).await?;
        }
        self.transaction = None;
        self.has_payload = false;
        Ok(())
    }

    async fn release(&mut self) -> Result<(), QueueError> {
        if let Some(txn) = self.transaction.take() {
            self.service.abort(txn).await?;
        }
        self.has_payload = false;
        Ok(())
    }
}
