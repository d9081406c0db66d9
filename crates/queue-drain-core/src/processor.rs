//! The batch processing loop.

use crate::command::Command;
use crate::context::MessageContext;
use crate::encoding::TextEncoding;
use crate::error::{ProcessError, RuleError};
use crate::strategy::QueueAccessStrategy;
use chrono::{Duration, Utc};
use queue_drain_runtime::{QueueAddress, Timestamp};
use tracing::debug;

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;

/// Messages younger than this are left for a later run, so a message
/// returned to the source tail is never picked up again in the same drain.
const CUTOFF_MARGIN: Duration = Duration::seconds(1);

/// Tunables for one drain run
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// The queue being drained
    pub source: QueueAddress,

    /// Encoding used to read and write message text
    pub encoding: TextEncoding,

    /// Messages handled per transaction batch
    pub batch_size: u32,

    /// Stop after this many messages; `None` drains to the cutoff
    pub max_messages: Option<u64>,

    /// Print a progress line every N messages; 0 disables
    pub report_interval: u64,
}

impl ProcessorConfig {
    /// Config with defaults: single-message batches, unbounded, progress
    /// every 1000 messages
    pub fn new(source: QueueAddress) -> Self {
        Self {
            source,
            encoding: TextEncoding::default(),
            batch_size: 1,
            max_messages: None,
            report_interval: 1000,
        }
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        if self.batch_size == 0 {
            return Err(RuleError::InvalidBatchSize);
        }
        Ok(())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    /// Messages read and dispatched, whether or not any action handled them
    pub processed: u64,
}

/// Drives a strategy through batches of messages, dispatching each message
/// to the first command whose filters match and whose action consumes it.
pub struct BatchProcessor {
    config: ProcessorConfig,
    commands: Vec<Command>,
    processed: u64,
}

impl BatchProcessor {
    /// Build a processor; fails when the command list is empty or the
    /// configuration is invalid
    pub fn new(config: ProcessorConfig, commands: Vec<Command>) -> Result<Self, RuleError> {
        if commands.is_empty() {
            return Err(RuleError::NoCommands);
        }
        config.validate()?;
        Ok(Self {
            config,
            commands,
            processed: 0,
        })
    }

    /// The command list, with any run state accumulated so far
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drain the source until it is empty, the cutoff is reached, or the
    /// message limit is hit.
    ///
    /// The cutoff is fixed once, just before the first batch; messages
    /// enqueued at or after it end the run. Command cleanup and strategy
    /// release always run, and a failure during them never masks the error
    /// that ended the drain.
    pub async fn run(
        &mut self,
        strategy: &mut dyn QueueAccessStrategy,
    ) -> Result<ProcessingStats, ProcessError> {
        for command in &mut self.commands {
            command.initialize()?;
        }

        let cutoff = Timestamp::from_datetime(Utc::now() - CUTOFF_MARGIN);
        self.processed = 0;

        let outcome = self.drain(strategy, cutoff).await;

        for command in &self.commands {
            command.cleanup();
        }
        let released = strategy.release().await;

        outcome?;
        released?;
        Ok(ProcessingStats {
            processed: self.processed,
        })
    }

    async fn drain(
        &mut self,
        strategy: &mut dyn QueueAccessStrategy,
        cutoff: Timestamp,
    ) -> Result<(), ProcessError> {
        loop {
            strategy.begin_batch().await?;

            for _ in 0..self.config.batch_size {
                if self
                    .config
                    .max_messages
                    .is_some_and(|max| self.processed >= max)
                {
                    debug!(processed = self.processed, "message limit reached");
                    strategy.commit_batch().await?;
                    return Ok(());
                }

                let Some(message) = strategy.get_next().await? else {
                    strategy.commit_batch().await?;
                    return Ok(());
                };

                if message.enqueued_at >= cutoff {
                    debug!(message_id = %message.id, "reached messages newer than the cutoff");
                    strategy.undo_get_next(message).await?;
                    return Ok(());
                }

                let mut context = MessageContext::new(message, self.config.encoding);
                let handled = self.dispatch(strategy, &mut context).await?;
                if !handled {
                    strategy.return_message(context.into_raw_message()).await?;
                }

                self.processed += 1;
                if self.config.report_interval > 0
                    && self.processed % self.config.report_interval == 0
                {
                    println!("{} messages processed.", self.processed);
                }
            }

            strategy.commit_batch().await?;
        }
    }

    async fn dispatch(
        &mut self,
        strategy: &mut dyn QueueAccessStrategy,
        context: &mut MessageContext,
    ) -> Result<bool, ProcessError> {
        for command in &mut self.commands {
            if command.matches(context) && command.perform_action(strategy, context).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
