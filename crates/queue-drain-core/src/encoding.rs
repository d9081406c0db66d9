//! Text encodings for message bodies and extension blobs.

use crate::error::RuleError;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
#[path = "encoding_tests.rs"]
mod tests;

/// Text encoding used to interpret message body bytes.
///
/// Decoding is lossy: invalid sequences become replacement characters rather
/// than failing, so binary-ish payloads can still be matched and printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Ascii,
}

impl TextEncoding {
    /// Decode bytes to text. Empty input decodes to `None`.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        if bytes.is_empty() {
            return None;
        }

        let text = match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Self::Ascii => bytes
                .iter()
                .map(|b| if b.is_ascii() { *b as char } else { '\u{FFFD}' })
                .collect(),
        };
        Some(text)
    }

    /// Encode text back to bytes in this encoding
    pub fn encode(&self, text: &str) -> Bytes {
        match self {
            Self::Utf8 => Bytes::copy_from_slice(text.as_bytes()),
            Self::Utf16Le => text
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect(),
            Self::Utf16Be => text
                .encode_utf16()
                .flat_map(|unit| unit.to_be_bytes())
                .collect(),
            Self::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
        }
    }

    /// Canonical name, as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Ascii => "ascii",
        }
    }
}

fn decode_utf16(bytes: &[u8], combine: fn([u8; 2]) -> u16) -> String {
    let chunks = bytes.chunks_exact(2);
    let truncated = !chunks.remainder().is_empty();
    let units: Vec<u16> = chunks.map(|pair| combine([pair[0], pair[1]])).collect();

    let mut text = String::from_utf16_lossy(&units);
    if truncated {
        text.push('\u{FFFD}');
    }
    text
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-16le" | "utf16le" | "utf-16" | "utf16" => Ok(Self::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Self::Utf16Be),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            _ => Err(RuleError::UnknownEncoding {
                name: s.to_string(),
            }),
        }
    }
}
