//! Commands: filter clauses bound to an action.

use crate::context::{MessageContext, ReadPart, WritePart};
use crate::error::{ProcessError, RuleError};
use crate::filter::Filter;
use crate::strategy::QueueAccessStrategy;
use queue_drain_runtime::{QueueAddress, QueueError};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;

/// What to do with a message once its filters match.
///
/// Move and Delete are terminal: they consume the message and stop further
/// command evaluation. Copy, Print, Count, and Alter observe or modify the
/// message and let evaluation continue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    /// Send a copy (fresh identifier) to another queue; the original stays
    Copy { to: QueueAddress },

    /// Send the message to another queue and remove it from the source
    Move { to: QueueAddress },

    /// Remove the message from the source
    Delete,

    /// Print a message part to stdout
    Print {
        #[serde(default)]
        part: ReadPart,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },

    /// Count matching messages; the total is reported after the run
    Count {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip)]
        total: u64,
    },

    /// Literal substring replacement in a writable part
    Alter {
        #[serde(default)]
        part: WritePart,
        search: String,
        replace: String,
    },
}

impl Action {
    /// The destination queue, for actions that send
    pub fn destination(&self) -> Option<&QueueAddress> {
        match self {
            Self::Copy { to } | Self::Move { to } => Some(to),
            _ => None,
        }
    }
}

/// One rule: an action guarded by zero or more filters.
///
/// An empty filter list matches every message; multiple filters are AND-ed
/// in declared order with short-circuit evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    #[serde(default, rename = "where")]
    pub filters: Vec<Filter>,

    #[serde(flatten)]
    pub action: Action,
}

impl Command {
    /// Prepare for a run: initialize filters and reset counters
    pub fn initialize(&mut self) -> Result<(), RuleError> {
        for filter in &mut self.filters {
            filter.initialize()?;
        }
        if let Action::Count { total, .. } = &mut self.action {
            *total = 0;
        }
        Ok(())
    }

    /// Evaluate the filter clauses against a message
    pub fn matches(&self, context: &mut MessageContext) -> bool {
        self.filters.iter().all(|filter| filter.matches(context))
    }

    /// Perform the action. Returns `true` when the message was consumed and
    /// evaluation must stop.
    pub async fn perform_action(
        &mut self,
        strategy: &mut dyn QueueAccessStrategy,
        context: &mut MessageContext,
    ) -> Result<bool, ProcessError> {
        match &mut self.action {
            Action::Copy { to } => {
                let copy = context.cloned_message();
                let copy_id = copy.id.clone();
                match strategy.send(to, copy).await {
                    Ok(()) => {
                        info!(message_id = %context.id(), copy_id = %copy_id, destination = %to, "copied message");
                    }
                    Err(QueueError::QueueNotFound { queue }) => {
                        error!(queue = %queue, message_id = %context.id(), "copy destination does not exist");
                    }
                    Err(err) => return Err(err.into()),
                }
                Ok(false)
            }
            Action::Move { to } => {
                let message = context.raw_message();
                match strategy.send(to, message).await {
                    Ok(()) => {
                        info!(message_id = %context.id(), destination = %to, "moved message");
                    }
                    Err(QueueError::QueueNotFound { queue }) => {
                        error!(queue = %queue, message_id = %context.id(), "move destination does not exist");
                        return Ok(false);
                    }
                    Err(err) => return Err(err.into()),
                }
                strategy.delete(context.id()).await?;
                Ok(true)
            }
            Action::Delete => {
                strategy.delete(context.id()).await?;
                Ok(true)
            }
            Action::Print { part, key } => {
                let value = context.get(*part, key.as_deref()).unwrap_or_default();
                println!("{value}");
                Ok(false)
            }
            Action::Count { total, .. } => {
                *total += 1;
                Ok(false)
            }
            Action::Alter {
                part,
                search,
                replace,
            } => {
                let read_part = match part {
                    WritePart::Body => ReadPart::Body,
                    WritePart::Extension => ReadPart::Extension,
                    WritePart::Label => ReadPart::Label,
                };
                if let Some(current) = context.get(read_part, None).map(str::to_string) {
                    let updated = current.replace(search.as_str(), replace);
                    context.set(&updated, *part);
                }
                Ok(false)
            }
        }
    }

    /// Report end-of-run state, counter totals for now
    pub fn cleanup(&self) {
        if let Action::Count { name, total } = &self.action {
            match name {
                Some(name) => println!("{name}: {total}"),
                None => println!("Counted {total} messages."),
            }
        }
    }
}
