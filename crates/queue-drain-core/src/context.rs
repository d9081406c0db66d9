//! Mutable per-message view used during rule evaluation.

use crate::encoding::TextEncoding;
use chrono::{DateTime, NaiveDateTime, Utc};
use queue_drain_runtime::{MessageId, RawMessage};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

/// Legacy sent-time format written by older producers
const LEGACY_SENT_FORMAT: &str = "%Y-%m-%d %H:%M:%S:%6f Z";

/// Header key carrying the producer-side send time
pub const SENT_TIME_HEADER: &str = "Time.Sent";

// ============================================================================
// Message Parts
// ============================================================================

/// A readable part of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadPart {
    #[default]
    Body,
    Extension,
    Label,
    Id,
    CorrelationId,
    Header,
}

/// A writable part of a message.
///
/// Identifiers and headers are not writable; the queue service owns message
/// identity, and headers are rewritten by replacing the extension blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WritePart {
    #[default]
    Body,
    Extension,
    Label,
}

/// One key/value pair from the extension header list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub key: String,
    pub value: String,
}

// ============================================================================
// MessageContext
// ============================================================================

/// A raw message plus lazily decoded views of its text parts.
///
/// The body is decoded on first read and re-encoded only if it was modified;
/// an untouched body round-trips byte-identical even when its bytes are not
/// valid in the configured encoding. Headers are parsed once from the
/// extension blob (a JSON array of key/value pairs) and the parse never
/// fails: a malformed blob reads as no headers.
pub struct MessageContext {
    message: RawMessage,
    encoding: TextEncoding,
    body: Option<Option<String>>,
    body_modified: bool,
    extension_text: Option<Option<String>>,
    headers: Option<Vec<HeaderInfo>>,
}

impl MessageContext {
    /// Wrap a raw message for evaluation
    pub fn new(message: RawMessage, encoding: TextEncoding) -> Self {
        Self {
            message,
            encoding,
            body: None,
            body_modified: false,
            extension_text: None,
            headers: None,
        }
    }

    /// The wrapped message's identifier
    pub fn id(&self) -> &MessageId {
        &self.message.id
    }

    /// When the queue service accepted the wrapped message
    pub fn enqueued_at(&self) -> queue_drain_runtime::Timestamp {
        self.message.enqueued_at
    }

    /// Read a message part as text.
    ///
    /// `key` selects the header for [`ReadPart::Header`] and is ignored for
    /// every other part. Missing or empty parts read as `None`.
    pub fn get(&mut self, part: ReadPart, key: Option<&str>) -> Option<&str> {
        match part {
            ReadPart::Body => self.body_text(),
            ReadPart::Extension => self.extension_text(),
            ReadPart::Label => {
                if self.message.label.is_empty() {
                    None
                } else {
                    Some(self.message.label.as_str())
                }
            }
            ReadPart::Id => Some(self.message.id.as_str()),
            ReadPart::CorrelationId => self.message.correlation_id.as_deref(),
            ReadPart::Header => self.header_value(key?),
        }
    }

    /// Replace a message part with new text
    pub fn set(&mut self, value: &str, part: WritePart) {
        match part {
            WritePart::Body => {
                self.body = Some(Some(value.to_string()));
                self.body_modified = true;
            }
            WritePart::Extension => {
                self.message.extension = self.encoding.encode(value);
                // Cached views of the old blob are stale now.
                self.extension_text = None;
                self.headers = None;
            }
            WritePart::Label => {
                self.message.label = value.to_string();
            }
        }
    }

    /// The parsed header list, in blob order
    pub fn headers(&mut self) -> &[HeaderInfo] {
        if self.headers.is_none() {
            let parsed = self
                .extension_text()
                .map(|text| serde_json::from_str(text).unwrap_or_default())
                .unwrap_or_default();
            self.headers = Some(parsed);
        }
        self.headers.as_deref().unwrap_or_default()
    }

    /// Look up a header value by key, first match wins
    pub fn header_value(&mut self, key: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|h| h.key.eq_ignore_ascii_case(key))
            .map(|h| h.value.as_str())
    }

    /// The producer-side send time, read from the `Time.Sent` header.
    ///
    /// Accepts RFC 3339 and the legacy `YYYY-MM-DD HH:MM:SS:ffffff Z` format.
    /// Missing or unparsable values read as `None`.
    pub fn sent_time_utc(&mut self) -> Option<DateTime<Utc>> {
        let raw = self.header_value(SENT_TIME_HEADER)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, LEGACY_SENT_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Snapshot the current message, re-encoding the body only if modified
    pub fn raw_message(&mut self) -> RawMessage {
        self.sync_body();
        self.message.clone()
    }

    /// Take the current message, consuming the context
    pub fn into_raw_message(mut self) -> RawMessage {
        self.sync_body();
        self.message
    }

    /// Snapshot the current message under a fresh identifier, for copy-style
    /// sends that must not collide with the original
    pub fn cloned_message(&mut self) -> RawMessage {
        self.sync_body();
        self.message.clone_for_copy()
    }

    fn sync_body(&mut self) {
        if !self.body_modified {
            return;
        }
        let text = self
            .body
            .as_ref()
            .and_then(|b| b.as_deref())
            .unwrap_or_default();
        self.message.body = self.encoding.encode(text);
        self.body_modified = false;
    }

    fn body_text(&mut self) -> Option<&str> {
        if self.body.is_none() {
            self.body = Some(self.encoding.decode(&self.message.body));
        }
        self.body.as_ref().and_then(|b| b.as_deref())
    }

    fn extension_text(&mut self) -> Option<&str> {
        if self.extension_text.is_none() {
            self.extension_text = Some(self.encoding.decode(&self.message.extension));
        }
        self.extension_text.as_ref().and_then(|t| t.as_deref())
    }
}
