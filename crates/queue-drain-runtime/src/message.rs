//! Message types, identifiers, and queue addressing.

use crate::error::ValidationError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated queue name with length and character restrictions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.is_empty() || name.len() > 260 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 1-260 characters".to_string(),
            });
        }

        // ASCII alphanumeric, hyphens, underscores, and dots only
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only ASCII alphanumeric, hyphens, underscores, and dots allowed"
                    .to_string(),
            });
        }

        if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "no leading/trailing hyphens or consecutive hyphens".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// A queue name with an optional server component, written `name@server`.
///
/// The server part is advisory for the in-memory service but is carried
/// through so remote destinations round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueAddress {
    queue: QueueName,
    server: Option<String>,
}

impl QueueAddress {
    /// Create address for a local queue
    pub fn local(queue: QueueName) -> Self {
        Self {
            queue,
            server: None,
        }
    }

    /// Create address for a queue on a named server
    pub fn remote(queue: QueueName, server: String) -> Self {
        Self {
            queue,
            server: Some(server),
        }
    }

    /// Get the queue name component
    pub fn queue(&self) -> &QueueName {
        &self.queue
    }

    /// Get the server component, if any
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }
}

impl fmt::Display for QueueAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.server {
            Some(server) => write!(f, "{}@{}", self.queue, server),
            None => write!(f, "{}", self.queue),
        }
    }
}

impl FromStr for QueueAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('@') {
            Some((queue, server)) => {
                if server.is_empty() {
                    return Err(ValidationError::InvalidFormat {
                        field: "queue_address".to_string(),
                        message: "server component must not be empty".to_string(),
                    });
                }
                Ok(Self::remote(queue.parse()?, server.to_string()))
            }
            None => Ok(Self::local(s.parse()?)),
        }
    }
}

impl Serialize for QueueAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QueueAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Unique identifier for messages within the queue system.
///
/// Queue-assigned: the service stamps a fresh identifier every time it
/// accepts a send, so a message that is received and re-sent changes identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = s.parse::<DateTime<Utc>>()?;
        Ok(Self::from_datetime(dt))
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// A raw wire message as stored by the queue service.
///
/// The body and extension blob are opaque byte sequences at this layer;
/// decoding them is the processing engine's concern. The extension blob
/// conventionally carries a serialized ordered list of header key/value pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: MessageId,
    pub correlation_id: Option<String>,
    pub label: String,
    pub body: Bytes,
    pub extension: Bytes,
    pub enqueued_at: Timestamp,
}

impl RawMessage {
    /// Create new message with body
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            id: MessageId::new(),
            correlation_id: None,
            label: String::new(),
            body: body.into(),
            extension: Bytes::new(),
            enqueued_at: Timestamp::now(),
        }
    }

    /// Set the message label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the correlation ID for tracking
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Set the extension blob
    pub fn with_extension(mut self, extension: impl Into<Bytes>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the enqueue timestamp (seeding and tests)
    pub fn with_enqueued_at(mut self, enqueued_at: Timestamp) -> Self {
        self.enqueued_at = enqueued_at;
        self
    }

    /// Clone for a copy-type action: fresh identifier, everything else copied
    pub fn clone_for_copy(&self) -> Self {
        Self {
            id: MessageId::new(),
            ..self.clone()
        }
    }
}
