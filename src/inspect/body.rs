//! Request body decoding.
//!
//! # Responsibilities
//! - Classify bytes as binary or text before anything else
//! - Dispatch text bodies on the declared media type
//! - Cap the decoded representation at the configured size
//!
//! # Design Decisions
//! - Never fails: every parse attempt returns `Option` and a miss degrades
//!   to the raw text
//! - XML is passed through verbatim
//! - Binary content is always base64, whatever the declared type

use std::collections::BTreeMap;
use std::convert::Infallible;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

/// Ratio of control bytes above which text is treated as binary.
pub const BINARY_THRESHOLD: f64 = 0.3;

/// Bytes below this value count as control bytes (except `\n`, `\r`, `\t`).
pub const MIN_PRINTABLE: u8 = 0x20;

/// Decoded representation of a request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BodyContent {
    /// Raw text passthrough.
    Text(String),
    /// Structurally decoded tree (JSON, form fields, multipart parts).
    Structured(Value),
    /// Standard base64 of binary content.
    Base64(String),
}

impl BodyContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            BodyContent::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            BodyContent::Structured(v) => Some(v),
            _ => None,
        }
    }
}

/// Description of a non-empty request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyDescriptor {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    /// Original length in bytes, before truncation.
    pub size: usize,
    pub content: BodyContent,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_binary: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Json,
    Xml,
    Form,
    Multipart,
    Text,
    Other,
}

impl MediaKind {
    fn classify(media_type: &str) -> Self {
        if media_type == "application/json" || media_type.ends_with("+json") {
            MediaKind::Json
        } else if media_type == "application/xml"
            || media_type == "text/xml"
            || media_type.ends_with("+xml")
        {
            MediaKind::Xml
        } else if media_type == "application/x-www-form-urlencoded" {
            MediaKind::Form
        } else if media_type == "multipart/form-data" {
            MediaKind::Multipart
        } else if media_type.starts_with("text/") {
            MediaKind::Text
        } else {
            MediaKind::Other
        }
    }
}

/// Content-type aware body decoder with a size cap.
#[derive(Debug, Clone)]
pub struct BodyDecoder {
    max_body_size: usize,
}

impl BodyDecoder {
    pub fn new(max_body_size: usize) -> Self {
        Self { max_body_size }
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Decode `body` according to `content_type`.
    ///
    /// Returns `None` for an empty body.
    pub fn parse(&self, body: &[u8], content_type: &str) -> Option<BodyDescriptor> {
        if body.is_empty() {
            return None;
        }

        let size = body.len();
        let truncated = size > self.max_body_size;
        let data = if truncated {
            &body[..self.max_body_size]
        } else {
            body
        };

        let descriptor = |content, is_binary| BodyDescriptor {
            content_type: content_type.to_string(),
            size,
            content,
            is_binary,
            truncated,
        };

        let text = match text_of(data) {
            Some(text) => text,
            None => return Some(descriptor(BodyContent::Base64(STANDARD.encode(data)), true)),
        };

        let content = match MediaKind::classify(&media_type(content_type)) {
            MediaKind::Json => parse_json(text),
            MediaKind::Form => parse_form(text),
            MediaKind::Multipart => parse_multipart(data, content_type),
            MediaKind::Xml | MediaKind::Text | MediaKind::Other => None,
        }
        .unwrap_or_else(|| BodyContent::Text(text.to_string()));

        Some(descriptor(content, false))
    }
}

/// Returns the data as text unless it looks binary.
fn text_of(data: &[u8]) -> Option<&str> {
    if data.contains(&0) {
        return None;
    }
    let text = std::str::from_utf8(data).ok()?;
    if control_ratio(data) > BINARY_THRESHOLD {
        return None;
    }
    Some(text)
}

/// True if the data contains a NUL byte, is not UTF-8, or is mostly
/// control bytes.
pub fn is_binary(data: &[u8]) -> bool {
    text_of(data).is_none()
}

fn control_ratio(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let control = data
        .iter()
        .filter(|&&b| b < MIN_PRINTABLE && b != b'\n' && b != b'\r' && b != b'\t')
        .count();
    control as f64 / data.len() as f64
}

/// Lower-cased media type without parameters.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn parse_json(text: &str) -> Option<BodyContent> {
    serde_json::from_str::<Value>(text)
        .ok()
        .map(BodyContent::Structured)
}

fn parse_form(text: &str) -> Option<BodyContent> {
    if !is_well_formed_form(text) {
        return None;
    }

    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(text.as_bytes()) {
        fields
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    let map: Map<String, Value> = fields
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                Value::String(values.remove(0))
            } else {
                Value::Array(values.into_iter().map(Value::String).collect())
            };
            (key, value)
        })
        .collect();

    Some(BodyContent::Structured(Value::Object(map)))
}

/// The form decoder is lenient; reject what a strict one would refuse.
fn is_well_formed_form(text: &str) -> bool {
    if text.contains(';') {
        return false;
    }
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            match escape {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

fn parse_multipart(data: &[u8], content_type: &str) -> Option<BodyContent> {
    let boundary = multer::parse_boundary(content_type).ok()?;
    let chunk = crlf_lines(data);
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(chunk) });
    let multipart = multer::Multipart::new(stream, boundary);

    // The stream is already in memory, so this never parks.
    futures::executor::block_on(collect_parts(multipart))
}

/// Multipart framing requires CRLF; bodies written with bare LF line
/// endings throughout are converted. Mixed bodies are left untouched.
fn crlf_lines(data: &[u8]) -> Bytes {
    if data.windows(2).any(|w| w == b"\r\n") || !data.contains(&b'\n') {
        return Bytes::copy_from_slice(data);
    }
    let mut converted = Vec::with_capacity(data.len() + data.len() / 16);
    for &byte in data {
        if byte == b'\n' {
            converted.push(b'\r');
        }
        converted.push(byte);
    }
    Bytes::from(converted)
}

async fn collect_parts(mut multipart: multer::Multipart<'static>) -> Option<BodyContent> {
    let mut fields = Map::new();
    while let Some(field) = multipart.next_field().await.ok()? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let part = field.bytes().await.ok()?;
        if name.is_empty() {
            continue;
        }

        let value = match file_name {
            Some(file_name) if !file_name.is_empty() => file_part(file_name, &part),
            _ => Value::String(String::from_utf8_lossy(&part).into_owned()),
        };
        fields.insert(name, value);
    }
    Some(BodyContent::Structured(Value::Object(fields)))
}

fn file_part(file_name: String, part: &[u8]) -> Value {
    let mut file = Map::new();
    file.insert("filename".into(), Value::String(file_name));
    file.insert("size".into(), Value::from(part.len()));
    match text_of(part) {
        Some(text) => {
            file.insert("content".into(), Value::String(text.to_string()));
        }
        None => {
            file.insert("content".into(), Value::String(STANDARD.encode(part)));
            file.insert("encoding".into(), Value::String("base64".into()));
        }
    }
    Value::Object(file)
}
