//! # Queue-Drain CLI
//!
//! Command-line interface for draining a queue through filter/action rules.
//!
//! A run loads a TOML rule file, seeds the in-memory queue service from an
//! optional JSON input file, drains the source queue batch by batch, and
//! prints a summary. Diagnostics go to stderr through `tracing`; rule output
//! (printed parts, counter totals, progress, the summary) goes to stdout.

use clap::{CommandFactory, Parser, Subcommand};
use chrono::{Duration, Utc};
use queue_drain_core::{
    create_strategy, BatchProcessor, Command, HeaderInfo, ProcessError, ProcessorConfig,
    RuleError, StrategyKind, TextEncoding,
};
use queue_drain_runtime::{InMemoryQueueService, QueueAddress, RawMessage, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// CLI Structure
// ============================================================================

/// Queue-Drain - transactional queue draining through filter/action rules
#[derive(Parser)]
#[command(name = "queue-drain")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drain a queue in bounded batches, applying filter/action rules")]
pub struct Cli {
    /// Logging level (overridden by RUST_LOG)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Drain a source queue, applying the rules from a file
    Run {
        /// Source queue, `name` or `name@server`
        source: String,

        /// TOML rule file with `[[command]]` tables
        #[arg(short, long)]
        rules: PathBuf,

        /// Text encoding for message bodies
        #[arg(short, long, default_value = "utf-8")]
        encoding: String,

        /// Messages per transaction batch
        #[arg(short, long, default_value = "1")]
        batch_size: u32,

        /// Stop after this many messages
        #[arg(short, long)]
        max_messages: Option<u64>,

        /// Print a progress line every N messages (0 disables)
        #[arg(long, default_value = "1000")]
        report_interval: u64,

        /// Queue access strategy
        #[arg(short, long, value_enum, default_value = "cursor")]
        strategy: StrategyArg,

        /// JSON file of messages to seed the source queue with
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print the named queue's remaining contents as JSON afterwards
        #[arg(short, long)]
        dump: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Queue access strategy selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum StrategyArg {
    /// Non-destructive cursor reads; removals by identifier
    Cursor,
    /// Destructive receives with explicit re-append
    Receive,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Cursor => StrategyKind::Cursor,
            StrategyArg::Receive => StrategyKind::Receive,
        }
    }
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Rule error: {0}")]
    Rules(#[from] RuleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Fatal queue-service failures exit with 10; an empty or missing source
    /// queue is not an error and never reaches this mapping.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration { .. } | Self::InvalidArgument { .. } | Self::Rules(_) => 1,
            Self::Io(_) => 2,
            Self::Process(ProcessError::Rules(_)) => 1,
            Self::Process(ProcessError::Queue(_)) => 10,
        }
    }
}

// ============================================================================
// File Formats
// ============================================================================

/// Rule file: a list of `[[command]]` tables
#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    command: Vec<Command>,
}

/// One message in a `--input` seed file
#[derive(Debug, Deserialize)]
struct SeedMessage {
    body: String,

    #[serde(default)]
    label: String,

    #[serde(default)]
    correlation_id: Option<String>,

    #[serde(default)]
    headers: Vec<HeaderInfo>,

    /// Seconds ago the message was enqueued; keeps seeded messages older
    /// than the run's cutoff
    #[serde(default = "default_age_secs")]
    age_secs: i64,
}

fn default_age_secs() -> i64 {
    5
}

/// One message in a `--dump` listing
#[derive(Debug, Serialize)]
struct DumpedMessage {
    id: String,
    label: String,
    body: String,
    correlation_id: Option<String>,
    enqueued_at: String,
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    match cli.command {
        Commands::Run {
            source,
            rules,
            encoding,
            batch_size,
            max_messages,
            report_interval,
            strategy,
            input,
            dump,
        } => {
            execute_run_command(RunArgs {
                source,
                rules,
                encoding,
                batch_size,
                max_messages,
                report_interval,
                strategy,
                input,
                dump,
            })
            .await
        }
        Commands::Completions { shell } => execute_completions_command(shell),
    }
}

/// Arguments of the `run` subcommand, bundled
struct RunArgs {
    source: String,
    rules: PathBuf,
    encoding: String,
    batch_size: u32,
    max_messages: Option<u64>,
    report_interval: u64,
    strategy: StrategyArg,
    input: Option<PathBuf>,
    dump: Option<String>,
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Initialize logging to stderr; stdout belongs to rule output
fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .map_err(|e| CliError::Configuration {
            message: format!("invalid log level '{}': {e}", cli.log_level),
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Configuration {
            message: format!("failed to initialize logging: {e}"),
        })
}

/// Execute the run command end to end
async fn execute_run_command(args: RunArgs) -> Result<(), CliError> {
    let source: QueueAddress =
        args.source
            .parse()
            .map_err(|e: queue_drain_runtime::ValidationError| CliError::InvalidArgument {
                arg: "source".to_string(),
                message: e.to_string(),
            })?;
    let encoding: TextEncoding = args.encoding.parse()?;
    let commands = load_rules(&args.rules)?;

    info!(
        source = %source,
        rules = %args.rules.display(),
        strategy = ?args.strategy,
        commands = commands.len(),
        "starting drain run"
    );

    let service = InMemoryQueueService::new();
    service.create_queue(&source);
    for destination in commands.iter().filter_map(|c| c.action.destination()) {
        service.create_queue(destination);
    }
    let dump_queue = args
        .dump
        .as_deref()
        .map(|raw| {
            raw.parse::<QueueAddress>()
                .map_err(|e| CliError::InvalidArgument {
                    arg: "dump".to_string(),
                    message: e.to_string(),
                })
        })
        .transpose()?;
    if let Some(queue) = &dump_queue {
        service.create_queue(queue);
    }

    if let Some(input) = &args.input {
        let seeded = seed_service(&service, &source, input, encoding)?;
        info!(messages = seeded, "seeded source queue");
    }

    let config = ProcessorConfig {
        source: source.clone(),
        encoding,
        batch_size: args.batch_size,
        max_messages: args.max_messages,
        report_interval: args.report_interval,
    };
    let mut processor = BatchProcessor::new(config, commands)?;
    let mut strategy =
        create_strategy(args.strategy.into(), Arc::new(service.clone()), source).await?;

    let start = std::time::Instant::now();
    let stats = processor.run(strategy.as_mut()).await?;
    let elapsed = start.elapsed();

    let rate = if elapsed.as_secs_f64() > 0.0 {
        stats.processed as f64 / elapsed.as_secs_f64()
    } else {
        stats.processed as f64
    };
    println!(
        "{} messages processed in {:.2?} ({:.0} msg/s).",
        stats.processed, elapsed, rate
    );

    if let Some(queue) = &dump_queue {
        dump_queue_contents(&service, queue, encoding)?;
    }
    Ok(())
}

/// Load and validate the rule file
fn load_rules(path: &Path) -> Result<Vec<Command>, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let file: RulesFile = toml::from_str(&raw).map_err(|e| CliError::Configuration {
        message: format!("invalid rule file {}: {e}", path.display()),
    })?;
    Ok(file.command)
}

/// Seed the source queue from a JSON message file
fn seed_service(
    service: &InMemoryQueueService,
    source: &QueueAddress,
    path: &Path,
    encoding: TextEncoding,
) -> Result<usize, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let seeds: Vec<SeedMessage> =
        serde_json::from_str(&raw).map_err(|e| CliError::Configuration {
            message: format!("invalid seed file {}: {e}", path.display()),
        })?;

    let count = seeds.len();
    for seed in seeds {
        let message = seed_to_message(seed, encoding);
        service
            .enqueue_direct(source, message)
            .map_err(ProcessError::from)?;
    }
    Ok(count)
}

fn seed_to_message(seed: SeedMessage, encoding: TextEncoding) -> RawMessage {
    let enqueued = Timestamp::from_datetime(Utc::now() - Duration::seconds(seed.age_secs));
    let mut message = RawMessage::new(encoding.encode(&seed.body))
        .with_label(seed.label)
        .with_enqueued_at(enqueued);
    if let Some(correlation_id) = seed.correlation_id {
        message = message.with_correlation_id(correlation_id);
    }
    if !seed.headers.is_empty() {
        let blob = serde_json::to_vec(&seed.headers).unwrap_or_default();
        message = message.with_extension(blob);
    }
    message
}

/// Print a queue's remaining contents as pretty JSON
fn dump_queue_contents(
    service: &InMemoryQueueService,
    queue: &QueueAddress,
    encoding: TextEncoding,
) -> Result<(), CliError> {
    let contents = service.queue_contents(queue).map_err(ProcessError::from)?;
    let dumped: Vec<DumpedMessage> = contents
        .into_iter()
        .map(|m| DumpedMessage {
            id: m.id.to_string(),
            label: m.label.clone(),
            body: encoding.decode(&m.body).unwrap_or_default(),
            correlation_id: m.correlation_id.clone(),
            enqueued_at: m.enqueued_at.to_string(),
        })
        .collect();

    let rendered = serde_json::to_string_pretty(&dumped).map_err(|e| CliError::Configuration {
        message: format!("failed to render dump: {e}"),
    })?;
    println!("{rendered}");
    Ok(())
}

/// Execute completions command
fn execute_completions_command(shell: clap_complete::Shell) -> Result<(), CliError> {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "queue-drain", &mut std::io::stdout());
    Ok(())
}
