//! # Queue-Drain Core
//!
//! The rule evaluation and batch processing engine: commands made of
//! filters and actions, lazily decoded message views, and the transactional
//! access strategies that drive a drain run over a
//! [`queue_drain_runtime::QueueService`].
//!
//! ## Module Organization
//!
//! - [`encoding`] - Text encodings for bodies and extension blobs
//! - [`context`] - Per-message view with lazy decode and header access
//! - [`criteria`] - Match criteria (regex, wildcard, substring, age)
//! - [`filter`] - Criterion bound to a message part, with negation
//! - [`command`] - Filters plus an action; dispatch semantics
//! - [`strategy`] - Cursor and receive access protocols
//! - [`processor`] - The batch loop and its configuration
//! - [`error`] - Rule and processing error types

pub mod command;
pub mod context;
pub mod criteria;
pub mod encoding;
pub mod error;
pub mod filter;
pub mod processor;
pub mod strategy;

// Re-export commonly used types at crate root for convenience
pub use command::{Action, Command};
pub use context::{HeaderInfo, MessageContext, ReadPart, WritePart, SENT_TIME_HEADER};
pub use criteria::{Criterion, StringComparison};
pub use encoding::TextEncoding;
pub use error::{ProcessError, RuleError};
pub use filter::Filter;
pub use processor::{BatchProcessor, ProcessingStats, ProcessorConfig};
pub use strategy::{create_strategy, CursorStrategy, QueueAccessStrategy, ReceiveStrategy, StrategyKind};
