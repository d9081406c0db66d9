//! Tests for the queue-drain-cli library module.

use super::*;
use queue_drain_core::Action;
use queue_drain_runtime::QueueError;

#[test]
fn parses_run_command_with_defaults() {
    let cli = Cli::try_parse_from([
        "queue-drain",
        "run",
        "orders",
        "--rules",
        "rules.toml",
    ])
    .unwrap();

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
            assert_eq!(source, "orders");
            assert_eq!(rules, PathBuf::from("rules.toml"));
            assert_eq!(encoding, "utf-8");
            assert_eq!(batch_size, 1);
            assert_eq!(max_messages, None);
            assert_eq!(report_interval, 1000);
            assert_eq!(strategy, StrategyArg::Cursor);
            assert_eq!(input, None);
            assert_eq!(dump, None);
        }
        _ => panic!("expected run command"),
    }
}

#[test]
fn parses_strategy_and_limits() {
    let cli = Cli::try_parse_from([
        "queue-drain",
        "run",
        "orders@mq01",
        "--rules",
        "r.toml",
        "--strategy",
        "receive",
        "--batch-size",
        "25",
        "--max-messages",
        "100",
    ])
    .unwrap();

    match cli.command {
        Commands::Run {
            strategy,
            batch_size,
            max_messages,
            ..
        } => {
            assert_eq!(strategy, StrategyArg::Receive);
            assert_eq!(StrategyKind::from(strategy), StrategyKind::Receive);
            assert_eq!(batch_size, 25);
            assert_eq!(max_messages, Some(100));
        }
        _ => panic!("expected run command"),
    }
}

#[test]
fn run_requires_a_rule_file() {
    assert!(Cli::try_parse_from(["queue-drain", "run", "orders"]).is_err());
}

#[test]
fn parses_completions_command() {
    let cli = Cli::try_parse_from(["queue-drain", "completions", "bash"]).unwrap();
    assert!(matches!(cli.command, Commands::Completions { .. }));
}

#[test]
fn rule_file_deserializes_commands() {
    let raw = r#"
        [[command]]
        action = "move"
        to = "dead-letter"

        [[command.where]]
        part = "body"
        contains = { text = "poison" }

        [[command]]
        action = "count"
        name = "remaining"
    "#;
    let file: RulesFile = toml::from_str(raw).unwrap();
    assert_eq!(file.command.len(), 2);

    assert!(matches!(file.command[0].action, Action::Move { .. }));
    assert_eq!(file.command[0].filters.len(), 1);
    assert!(matches!(file.command[1].action, Action::Count { .. }));
    assert!(file.command[1].filters.is_empty());
}

#[test]
fn empty_rule_file_parses_to_no_commands() {
    let file: RulesFile = toml::from_str("").unwrap();
    assert!(file.command.is_empty());
}

#[test]
fn seed_messages_default_to_backdated() {
    let raw = r#"[ { "body": "hello" } ]"#;
    let seeds: Vec<SeedMessage> = serde_json::from_str(raw).unwrap();
    assert_eq!(seeds.len(), 1);
    assert_eq!(seeds[0].age_secs, 5);

    let message = seed_to_message(seeds.into_iter().next().unwrap(), TextEncoding::Utf8);
    assert_eq!(&message.body[..], b"hello");
    assert!(message.enqueued_at < Timestamp::now());
}

#[test]
fn seed_messages_carry_headers_and_metadata() {
    let raw = r#"[ {
        "body": "hello",
        "label": "greeting",
        "correlation_id": "corr-1",
        "headers": [ { "key": "Time.Sent", "value": "2024-03-01T10:20:30Z" } ],
        "age_secs": 60
    } ]"#;
    let seeds: Vec<SeedMessage> = serde_json::from_str(raw).unwrap();
    let message = seed_to_message(seeds.into_iter().next().unwrap(), TextEncoding::Utf8);

    assert_eq!(message.label, "greeting");
    assert_eq!(message.correlation_id.as_deref(), Some("corr-1"));
    assert!(!message.extension.is_empty());
}

#[test]
fn exit_codes_map_by_error_class() {
    let config = CliError::Configuration {
        message: "bad".to_string(),
    };
    assert_eq!(config.exit_code(), 1);

    let rules = CliError::Rules(RuleError::NoCommands);
    assert_eq!(rules.exit_code(), 1);

    let io = CliError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
    assert_eq!(io.exit_code(), 2);

    let queue = CliError::Process(ProcessError::Queue(QueueError::ServiceFailure {
        message: "down".to_string(),
    }));
    assert_eq!(queue.exit_code(), 10);
}
