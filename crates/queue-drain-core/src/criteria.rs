//! Match criteria applied to message parts.

use crate::context::{MessageContext, ReadPart};
use crate::error::RuleError;
use chrono::{DateTime, Duration, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "criteria_tests.rs"]
mod tests;

/// Case handling for text comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringComparison {
    #[default]
    IgnoreCase,
    CaseSensitive,
}

impl StringComparison {
    fn contains(&self, haystack: &str, needle: &str) -> bool {
        match self {
            Self::CaseSensitive => haystack.contains(needle),
            Self::IgnoreCase => haystack.to_lowercase().contains(&needle.to_lowercase()),
        }
    }

    fn equals(&self, left: &str, right: &str) -> bool {
        match self {
            Self::CaseSensitive => left == right,
            Self::IgnoreCase => left.to_lowercase() == right.to_lowercase(),
        }
    }
}

/// A single match criterion.
///
/// Criteria are deserialized from the rules file and must be initialized
/// before use: [`Criterion::initialize`] compiles patterns and pins the
/// reference time for age checks, so every message in a run is measured
/// against the same clock reading.
///
/// Evaluation never errors. A part or header that is missing, or a sent-time
/// header that cannot be parsed, simply does not match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criterion {
    /// Regular expression match anywhere in the text
    Matches {
        pattern: String,
        #[serde(skip)]
        regex: Option<Regex>,
    },

    /// Wildcard match over the whole text: `*` matches any run of
    /// characters, `?` matches exactly one
    Like {
        pattern: String,
        #[serde(skip)]
        regex: Option<Regex>,
    },

    /// Substring match
    Contains {
        text: String,
        #[serde(default)]
        comparison: StringComparison,
    },

    /// Whole-text equality
    Equals {
        text: String,
        #[serde(default)]
        comparison: StringComparison,
    },

    /// Message sent strictly more than `seconds` before the run's reference
    /// time, judged by the producer's sent-time header
    OlderThan {
        seconds: i64,
        #[serde(skip)]
        reference: Option<DateTime<Utc>>,
    },
}

impl Criterion {
    /// Compile patterns and pin the age-check reference time
    pub fn initialize(&mut self) -> Result<(), RuleError> {
        match self {
            Self::Matches { pattern, regex } => {
                *regex = Some(compile(pattern, pattern.clone())?);
            }
            Self::Like { pattern, regex } => {
                *regex = Some(compile(&wildcard_to_regex(pattern), pattern.clone())?);
            }
            Self::OlderThan { reference, .. } => {
                *reference = Some(Utc::now());
            }
            Self::Contains { .. } | Self::Equals { .. } => {}
        }
        Ok(())
    }

    /// Evaluate against one part of a message
    pub fn matches(&self, context: &mut MessageContext, part: ReadPart, key: Option<&str>) -> bool {
        match self {
            Self::Matches { regex, .. } | Self::Like { regex, .. } => {
                let Some(regex) = regex else {
                    return false;
                };
                context
                    .get(part, key)
                    .is_some_and(|value| regex.is_match(value))
            }
            Self::Contains { text, comparison } => context
                .get(part, key)
                .is_some_and(|value| comparison.contains(value, text)),
            Self::Equals { text, comparison } => context
                .get(part, key)
                .is_some_and(|value| comparison.equals(value, text)),
            Self::OlderThan { seconds, reference } => {
                let Some(sent) = context.sent_time_utc() else {
                    return false;
                };
                let reference = reference.unwrap_or_else(Utc::now);
                reference - sent > Duration::seconds(*seconds)
            }
        }
    }
}

fn compile(pattern: &str, original: String) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map_err(|source| RuleError::InvalidPattern {
            pattern: original,
            source,
        })
}

/// Translate a `*`/`?` wildcard pattern into an anchored regex
fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    out.push('^');
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    out.push('$');
    out
}
