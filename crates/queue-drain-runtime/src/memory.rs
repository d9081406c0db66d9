//! In-memory transactional queue service.
//!
//! A fully functional FIFO queue service holding everything in process
//! memory. It implements the same transactional semantics the processing
//! engine relies on from a real queue service:
//!
//! - sends inside a transaction are buffered and become visible at commit
//! - receives remove messages immediately but are restored at their original
//!   positions, with their original identifiers, on abort
//! - cursors peek without removing and survive removals ahead of them
//!
//! Reads never block: a read with nothing available returns
//! [`QueueError::Timeout`] immediately.

use crate::error::QueueError;
use crate::message::{MessageId, QueueAddress, RawMessage, Timestamp};
use crate::service::{CursorId, PeekMode, QueueService, TransactionId};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

#[derive(Default)]
struct ServiceState {
    queues: HashMap<QueueAddress, VecDeque<RawMessage>>,
    transactions: HashMap<u64, TransactionState>,
    cursors: HashMap<u64, CursorState>,
    next_transaction: u64,
    next_cursor: u64,
}

/// Per-transaction bookkeeping for undo and deferred sends
#[derive(Default)]
struct TransactionState {
    removed: Vec<RemovedMessage>,
    sent: Vec<(QueueAddress, RawMessage)>,
}

/// A message removed inside a transaction, with enough context to restore it
struct RemovedMessage {
    queue: QueueAddress,
    index: usize,
    message: RawMessage,
}

/// A forward-only read position into one queue.
///
/// `current` anchors the cursor to a message identity; `position` is the
/// index that message occupied. When the current message is removed,
/// `current` clears and `position` names the slot its successor shifted into.
struct CursorState {
    queue: QueueAddress,
    current: Option<MessageId>,
    position: usize,
}

/// Adjust cursors on `queue` after a removal at `index`
fn cursors_note_removed(cursors: &mut HashMap<u64, CursorState>, queue: &QueueAddress, index: usize) {
    for cursor in cursors.values_mut().filter(|c| &c.queue == queue) {
        if index < cursor.position {
            cursor.position -= 1;
        } else if index == cursor.position {
            cursor.current = None;
        }
    }
}

/// Adjust cursors on `queue` after a restore insertion at `index`
fn cursors_note_restored(
    cursors: &mut HashMap<u64, CursorState>,
    queue: &QueueAddress,
    index: usize,
) {
    for cursor in cursors.values_mut().filter(|c| &c.queue == queue) {
        if index < cursor.position || (index == cursor.position && cursor.current.is_some()) {
            cursor.position += 1;
        }
    }
}

// ============================================================================
// InMemoryQueueService
// ============================================================================

/// In-memory queue service implementation
#[derive(Clone)]
pub struct InMemoryQueueService {
    state: Arc<RwLock<ServiceState>>,
}

impl InMemoryQueueService {
    /// Create a new service with no queues
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ServiceState::default())),
        }
    }

    /// Create a queue if it does not already exist
    pub fn create_queue(&self, queue: &QueueAddress) {
        let mut state = self.write_state();
        state.queues.entry(queue.clone()).or_default();
    }

    /// Snapshot a queue's current contents in order
    pub fn queue_contents(&self, queue: &QueueAddress) -> Result<Vec<RawMessage>, QueueError> {
        let state = self.read_state();
        state
            .queues
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .ok_or_else(|| QueueError::QueueNotFound {
                queue: queue.to_string(),
            })
    }

    /// Append a message directly, outside any transaction, preserving its
    /// enqueue timestamp. Used for seeding queues in tests and the CLI.
    pub fn enqueue_direct(
        &self,
        queue: &QueueAddress,
        mut message: RawMessage,
    ) -> Result<MessageId, QueueError> {
        let mut state = self.write_state();
        message.id = MessageId::new();
        let id = message.id.clone();
        let entries = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::QueueNotFound {
                queue: queue.to_string(),
            })?;
        entries.push_back(message);
        Ok(id)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ServiceState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, ServiceState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for InMemoryQueueService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueService for InMemoryQueueService {
    async fn begin_transaction(&self) -> Result<TransactionId, QueueError> {
        let mut state = self.write_state();
        let id = state.next_transaction;
        state.next_transaction += 1;
        state.transactions.insert(id, TransactionState::default());
        Ok(TransactionId::new(id))
    }

    async fn commit(&self, transaction: TransactionId) -> Result<(), QueueError> {
        let mut state = self.write_state();
        let txn = state
            .transactions
            .remove(&transaction.value())
            .ok_or(QueueError::TransactionNotFound {
                id: transaction.value(),
            })?;

        // Removals become permanent; buffered sends are applied in order.
        for (queue, message) in txn.sent {
            let entries =
                state
                    .queues
                    .get_mut(&queue)
                    .ok_or_else(|| QueueError::QueueNotFound {
                        queue: queue.to_string(),
                    })?;
            entries.push_back(message);
        }
        Ok(())
    }

    async fn abort(&self, transaction: TransactionId) -> Result<(), QueueError> {
        let mut state = self.write_state();
        let txn = state
            .transactions
            .remove(&transaction.value())
            .ok_or(QueueError::TransactionNotFound {
                id: transaction.value(),
            })?;

        // Buffered sends are dropped; removals are restored at their original
        // positions, most recent first so earlier indexes stay valid.
        for removal in txn.removed.into_iter().rev() {
            let index = {
                let Some(entries) = state.queues.get_mut(&removal.queue) else {
                    continue;
                };
                let index = removal.index.min(entries.len());
                entries.insert(index, removal.message);
                index
            };
            cursors_note_restored(&mut state.cursors, &removal.queue, index);
        }
        Ok(())
    }

    async fn create_cursor(&self, queue: &QueueAddress) -> Result<CursorId, QueueError> {
        let mut state = self.write_state();
        let id = state.next_cursor;
        state.next_cursor += 1;
        state.cursors.insert(
            id,
            CursorState {
                queue: queue.clone(),
                current: None,
                position: 0,
            },
        );
        Ok(CursorId::new(id))
    }

    async fn close_cursor(&self, cursor: CursorId) -> Result<(), QueueError> {
        let mut state = self.write_state();
        state
            .cursors
            .remove(&cursor.value())
            .map(|_| ())
            .ok_or(QueueError::CursorNotFound { id: cursor.value() })
    }

    async fn peek(
        &self,
        queue: &QueueAddress,
        cursor: CursorId,
        mode: PeekMode,
        timeout: Duration,
    ) -> Result<RawMessage, QueueError> {
        let mut state = self.write_state();
        let state = &mut *state;

        let cursor_state =
            state
                .cursors
                .get_mut(&cursor.value())
                .ok_or(QueueError::CursorNotFound { id: cursor.value() })?;
        let entries = state
            .queues
            .get(queue)
            .ok_or_else(|| QueueError::QueueNotFound {
                queue: queue.to_string(),
            })?;

        let target = match &cursor_state.current {
            Some(id) => match entries.iter().position(|m| &m.id == id) {
                Some(index) => match mode {
                    PeekMode::Current => index,
                    PeekMode::Next => index + 1,
                },
                // The current message was removed; its successor now sits at
                // the remembered position.
                None => cursor_state.position,
            },
            None => cursor_state.position,
        };

        let message = entries
            .get(target)
            .cloned()
            .ok_or(QueueError::Timeout { duration: timeout })?;
        cursor_state.position = target;
        cursor_state.current = Some(message.id.clone());
        Ok(message)
    }

    async fn receive(
        &self,
        queue: &QueueAddress,
        timeout: Duration,
        transaction: TransactionId,
    ) -> Result<RawMessage, QueueError> {
        let mut state = self.write_state();
        if !state.transactions.contains_key(&transaction.value()) {
            return Err(QueueError::TransactionNotFound {
                id: transaction.value(),
            });
        }

        let message = {
            let entries = state
                .queues
                .get_mut(queue)
                .ok_or_else(|| QueueError::QueueNotFound {
                    queue: queue.to_string(),
                })?;
            entries
                .pop_front()
                .ok_or(QueueError::Timeout { duration: timeout })?
        };

        cursors_note_removed(&mut state.cursors, queue, 0);
        if let Some(txn) = state.transactions.get_mut(&transaction.value()) {
            txn.removed.push(RemovedMessage {
                queue: queue.clone(),
                index: 0,
                message: message.clone(),
            });
        }
        Ok(message)
    }

    async fn send(
        &self,
        queue: &QueueAddress,
        mut message: RawMessage,
        transaction: TransactionId,
    ) -> Result<MessageId, QueueError> {
        let mut state = self.write_state();
        if !state.queues.contains_key(queue) {
            return Err(QueueError::QueueNotFound {
                queue: queue.to_string(),
            });
        }

        let txn = state
            .transactions
            .get_mut(&transaction.value())
            .ok_or(QueueError::TransactionNotFound {
                id: transaction.value(),
            })?;

        message.id = MessageId::new();
        message.enqueued_at = Timestamp::now();
        let id = message.id.clone();
        txn.sent.push((queue.clone(), message));
        Ok(id)
    }

    async fn receive_by_id(
        &self,
        queue: &QueueAddress,
        id: &MessageId,
        transaction: TransactionId,
    ) -> Result<RawMessage, QueueError> {
        let mut state = self.write_state();
        if !state.transactions.contains_key(&transaction.value()) {
            return Err(QueueError::TransactionNotFound {
                id: transaction.value(),
            });
        }

        let (index, message) = {
            let entries = state
                .queues
                .get_mut(queue)
                .ok_or_else(|| QueueError::QueueNotFound {
                    queue: queue.to_string(),
                })?;
            let index = entries
                .iter()
                .position(|m| &m.id == id)
                .ok_or_else(|| QueueError::MessageNotFound { id: id.to_string() })?;
            match entries.remove(index) {
                Some(message) => (index, message),
                None => {
                    return Err(QueueError::MessageNotFound { id: id.to_string() });
                }
            }
        };

        cursors_note_removed(&mut state.cursors, queue, index);
        if let Some(txn) = state.transactions.get_mut(&transaction.value()) {
            txn.removed.push(RemovedMessage {
                queue: queue.clone(),
                index,
                message: message.clone(),
            });
        }
        Ok(message)
    }

    async fn queue_exists(&self, queue: &QueueAddress) -> bool {
        self.read_state().queues.contains_key(queue)
    }
}
