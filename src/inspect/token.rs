//! Security token extraction.
//!
//! # Responsibilities
//! - Probe a configured, ordered set of headers for three-segment tokens
//! - Decode the header and payload segments for display
//!
//! # Design Decisions
//! - Structural decoding only; signatures are never checked
//! - A token is reported whole or not at all

use std::collections::BTreeMap;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Serialize;
use serde_json::{Map, Value};

/// Tokens up to this many characters are displayed verbatim.
const DISPLAY_LIMIT: usize = 30;

/// Characters kept at each end of a shortened display token.
const DISPLAY_EDGE: usize = 10;

/// Standard alphabet after the url-safe remap; padding is repaired before
/// decoding and stray trailing bits are tolerated.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// A structurally valid token found in a request header.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    /// Display form of the token; see [`display_token`].
    pub raw_token: String,
    pub header: Map<String, Value>,
    pub payload: Map<String, Value>,
}

/// Scans request headers for embedded tokens.
#[derive(Debug, Clone)]
pub struct TokenExtractor {
    header_names: Vec<String>,
}

impl TokenExtractor {
    pub fn new(header_names: Vec<String>) -> Self {
        Self { header_names }
    }

    pub fn header_names(&self) -> &[String] {
        &self.header_names
    }

    /// Decode every configured header carrying a valid token.
    ///
    /// Each name is looked up as configured, then lower-cased.
    pub fn extract(&self, headers: &BTreeMap<String, String>) -> BTreeMap<String, TokenDescriptor> {
        let mut tokens = BTreeMap::new();

        for name in &self.header_names {
            let value = headers
                .get(name)
                .filter(|v| !v.is_empty())
                .or_else(|| headers.get(&name.to_ascii_lowercase()))
                .filter(|v| !v.is_empty());

            if let Some(token) = value.and_then(|v| decode_token(strip_bearer(v))) {
                tokens.insert(name.clone(), token);
            }
        }

        tokens
    }
}

/// Remove a case-insensitive `Bearer ` prefix and surrounding whitespace.
pub fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => value[7..].trim(),
        _ => value,
    }
}

/// Decode a `header.payload.signature` token.
///
/// Returns `None` unless there are exactly three non-empty segments and the
/// first two both decode to JSON objects.
pub fn decode_token(token: &str) -> Option<TokenDescriptor> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    let header = decode_segment(segments[0])?;
    let payload = decode_segment(segments[1])?;

    Some(TokenDescriptor {
        raw_token: display_token(token),
        header,
        payload,
    })
}

/// Shorten long tokens to `first10...last10` for display.
pub fn display_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= DISPLAY_LIMIT {
        return token.to_string();
    }
    let head: String = token.chars().take(DISPLAY_EDGE).collect();
    let tail: String = token.chars().skip(count - DISPLAY_EDGE).collect();
    format!("{}...{}", head, tail)
}

fn decode_segment(segment: &str) -> Option<Map<String, Value>> {
    let mut standard: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    let padding = (4 - standard.len() % 4) % 4;
    standard.extend(std::iter::repeat('=').take(padding));

    let bytes = SEGMENT_ENGINE.decode(standard).ok()?;
    serde_json::from_slice(&bytes).ok()
}
