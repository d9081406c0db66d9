//! Filters bind a criterion to a message part.

use crate::context::{MessageContext, ReadPart};
use crate::criteria::Criterion;
use crate::error::RuleError;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;

/// One filter clause: which part to read, the criterion to apply, and
/// whether the verdict is negated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    /// The message part the criterion reads
    #[serde(default)]
    pub part: ReadPart,

    /// Header key, required when `part` is [`ReadPart::Header`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Invert the criterion's verdict
    #[serde(default)]
    pub not: bool,

    #[serde(flatten)]
    pub criterion: Criterion,
}

impl Filter {
    /// Validate the part/key pairing and initialize the criterion
    pub fn initialize(&mut self) -> Result<(), RuleError> {
        if self.part == ReadPart::Header && self.key.is_none() {
            return Err(RuleError::MissingHeaderKey);
        }
        self.criterion.initialize()
    }

    /// Evaluate against a message.
    ///
    /// With `not` set, a missing part matches: negation applies to the
    /// criterion's verdict, not to the part's presence.
    pub fn matches(&self, context: &mut MessageContext) -> bool {
        let verdict = self
            .criterion
            .matches(context, self.part, self.key.as_deref());
        self.not ^ verdict
    }
}
