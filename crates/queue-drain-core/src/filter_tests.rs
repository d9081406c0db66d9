//! Tests for filter clauses.

use super::*;
use crate::criteria::StringComparison;
use crate::encoding::TextEncoding;
use queue_drain_runtime::RawMessage;

fn labeled_context(label: &str) -> MessageContext {
    MessageContext::new(
        RawMessage::new(b"body text".to_vec()).with_label(label),
        TextEncoding::Utf8,
    )
}

fn contains(text: &str) -> Criterion {
    Criterion::Contains {
        text: text.to_string(),
        comparison: StringComparison::default(),
    }
}

#[test]
fn matches_selected_part() {
    let mut filter = Filter {
        part: ReadPart::Label,
        key: None,
        not: false,
        criterion: contains("err"),
    };
    filter.initialize().unwrap();

    assert!(filter.matches(&mut labeled_context("error-report")));
    assert!(!filter.matches(&mut labeled_context("ok")));
}

#[test]
fn not_inverts_the_verdict() {
    let mut filter = Filter {
        part: ReadPart::Label,
        key: None,
        not: true,
        criterion: contains("err"),
    };
    filter.initialize().unwrap();

    assert!(!filter.matches(&mut labeled_context("error-report")));
    assert!(filter.matches(&mut labeled_context("ok")));
}

#[test]
fn negated_filter_matches_when_part_is_missing() {
    let mut filter = Filter {
        part: ReadPart::CorrelationId,
        key: None,
        not: true,
        criterion: contains("anything"),
    };
    filter.initialize().unwrap();

    // No correlation id: the criterion cannot match, so the negation does.
    assert!(filter.matches(&mut labeled_context("l")));
}

#[test]
fn header_part_requires_a_key() {
    let mut filter = Filter {
        part: ReadPart::Header,
        key: None,
        not: false,
        criterion: contains("x"),
    };
    assert!(matches!(
        filter.initialize(),
        Err(RuleError::MissingHeaderKey)
    ));
}

#[test]
fn deserializes_with_flattened_criterion() {
    let raw = r#"{ "part": "label", "not": true, "contains": { "text": "spam" } }"#;
    let mut filter: Filter = serde_json::from_str(raw).unwrap();
    filter.initialize().unwrap();

    assert_eq!(filter.part, ReadPart::Label);
    assert!(filter.not);
    assert!(!filter.matches(&mut labeled_context("spam-report")));
}

#[test]
fn part_defaults_to_body() {
    let raw = r#"{ "contains": { "text": "body" } }"#;
    let mut filter: Filter = serde_json::from_str(raw).unwrap();
    filter.initialize().unwrap();

    assert!(filter.matches(&mut labeled_context("anything")));
}
