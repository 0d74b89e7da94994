//! Wire codec for value sets
//!
//! Request bodies are JSON arrays of `{index, type, data}` objects. Decoding
//! is all-or-nothing: the first offending element aborts the whole parse.
//! The `data` field is type-aware in both directions, plain text for textual
//! types and standard base64 for binary ones such as `HS_ADMIN`. A textual
//! value whose bytes are not UTF-8 is written as base64 and marked with
//! `"encoding": "base64"`; the decoder honors the same marker.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use handle_types::{is_binary_type, HandleName, Permissions, Ttl, ValueRecord};
use serde::Serialize;
use serde_json::error::Category;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Where in a request body a decoding error was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Line and column of a JSON syntax error
    Text { line: usize, column: usize },
    /// The document as a whole
    Root,
    /// Element of a value array
    Element(usize),
    /// A batch descriptor, or one of the values inside it
    Entry { entry: usize, element: Option<usize> },
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Text { line, column } => write!(f, "line {}, column {}", line, column),
            Position::Root => f.write_str("document root"),
            Position::Element(element) => write!(f, "element {}", element),
            Position::Entry {
                entry,
                element: None,
            } => write!(f, "entry {}", entry),
            Position::Entry {
                entry,
                element: Some(element),
            } => write!(f, "entry {}, element {}", entry, element),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at {position})")]
pub struct CodecError {
    pub position: Position,
    pub message: String,
}

impl CodecError {
    pub fn at(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// One handle's worth of a creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTuple {
    /// Explicit handle name; `None` asks for a generated one
    pub handle: Option<HandleName>,
    pub values: Vec<ValueRecord>,
}

/// Encoded form of a value as returned to readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireValue {
    pub index: u32,
    #[serde(rename = "type")]
    pub value_type: String,
    pub data: String,
    /// Set when `data` is base64 although the type is textual
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<&'static str>,
    pub permissions: String,
    pub ttl: u32,
    pub ttl_type: &'static str,
    pub timestamp: String,
}

impl From<&ValueRecord> for WireValue {
    fn from(record: &ValueRecord) -> Self {
        let (data, encoding) = render_data(record);
        Self {
            index: record.index,
            value_type: record.value_type.clone(),
            data,
            encoding,
            permissions: record.permissions.to_string(),
            ttl: record.ttl.seconds(),
            ttl_type: record.ttl.kind(),
            timestamp: record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

/// Marker for textual values carried as base64
pub const BASE64_ENCODING: &str = "base64";

/// Text for textual types, base64 for binary ones.
///
/// Textual data that is not valid UTF-8 falls back to base64 and returns
/// the encoding marker alongside.
pub fn render_data(record: &ValueRecord) -> (String, Option<&'static str>) {
    if record.is_binary() {
        return (BASE64.encode(&record.data), None);
    }
    match std::str::from_utf8(&record.data) {
        Ok(text) => (text.to_string(), None),
        Err(_) => (BASE64.encode(&record.data), Some(BASE64_ENCODING)),
    }
}

/// Encode a value set, keeping the order the service returned it in
pub fn encode_value_set(records: &[ValueRecord]) -> Vec<WireValue> {
    records.iter().map(WireValue::from).collect()
}

/// Decode a request body holding a single value array
pub fn decode_value_set(body: &[u8]) -> Result<Vec<ValueRecord>, CodecError> {
    let items = parse_root(body)?;
    decode_values(&items)
        .map_err(|(element, message)| CodecError::at(Position::Element(element), message))
}

/// Decode a creation request body.
///
/// A plain value array is one unnamed tuple. An array of
/// `{"handle": ..., "values": [...]}` descriptors is one tuple per
/// descriptor. The first element decides which form is being used.
pub fn decode_batch(body: &[u8]) -> Result<Vec<BatchTuple>, CodecError> {
    let items = parse_root(body)?;

    if !items.first().is_some_and(is_descriptor) {
        let values = decode_values(&items)
            .map_err(|(element, message)| CodecError::at(Position::Element(element), message))?;
        return Ok(vec![BatchTuple {
            handle: None,
            values,
        }]);
    }

    items
        .iter()
        .enumerate()
        .map(|(entry, item)| decode_descriptor(entry, item))
        .collect()
}

fn parse_root(body: &[u8]) -> Result<Vec<Value>, CodecError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(CodecError::at(Position::Root, "empty request body"));
    }

    let root: Value = serde_json::from_slice(body).map_err(|e| {
        let message = match e.classify() {
            Category::Eof => "unexpected end of JSON",
            Category::Syntax => "malformed JSON",
            Category::Data | Category::Io => "unreadable JSON",
        };
        CodecError::at(
            Position::Text {
                line: e.line(),
                column: e.column(),
            },
            message,
        )
    })?;

    match root {
        Value::Array(items) => Ok(items),
        other => Err(CodecError::at(
            Position::Root,
            format!("base JSON element must be an array, found {}", json_kind(&other)),
        )),
    }
}

fn is_descriptor(item: &Value) -> bool {
    item.as_object()
        .is_some_and(|fields| fields.keys().any(|k| k.eq_ignore_ascii_case("values")))
}

fn decode_descriptor(entry: usize, item: &Value) -> Result<BatchTuple, CodecError> {
    let entry_error =
        |message: String| CodecError::at(Position::Entry { entry, element: None }, message);

    let fields = item.as_object().ok_or_else(|| {
        entry_error(format!("expected a handle descriptor, found {}", json_kind(item)))
    })?;

    let mut handle = None;
    let mut values = None;
    for (key, value) in fields {
        match key.to_ascii_lowercase().as_str() {
            "handle" => {
                let name = value
                    .as_str()
                    .ok_or_else(|| entry_error("field 'handle' must be a string".to_string()))?;
                if !name.is_empty() {
                    handle = Some(HandleName::new(name));
                }
            }
            "values" => {
                let items = value
                    .as_array()
                    .ok_or_else(|| entry_error("field 'values' must be an array".to_string()))?;
                let decoded = decode_values(items).map_err(|(element, message)| {
                    CodecError::at(
                        Position::Entry {
                            entry,
                            element: Some(element),
                        },
                        message,
                    )
                })?;
                values = Some(decoded);
            }
            _ => return Err(entry_error(format!("unrecognized field '{}'", key))),
        }
    }

    let values = values.ok_or_else(|| entry_error("missing field 'values'".to_string()))?;
    Ok(BatchTuple { handle, values })
}

fn decode_values(items: &[Value]) -> Result<Vec<ValueRecord>, (usize, String)> {
    let mut seen = HashSet::new();
    items
        .iter()
        .enumerate()
        .map(|(element, item)| {
            let record = decode_value(item).map_err(|message| (element, message))?;
            if !seen.insert(record.index) {
                return Err((element, format!("duplicate index {}", record.index)));
            }
            Ok(record)
        })
        .collect()
}

fn decode_value(item: &Value) -> Result<ValueRecord, String> {
    let fields = item
        .as_object()
        .ok_or_else(|| format!("expected an object, found {}", json_kind(item)))?;

    let mut index = 0;
    let mut value_type = None;
    let mut data = None;
    let mut permissions = None;
    let mut ttl_secs = None;
    let mut ttl_kind = None;
    let mut timestamp = None;
    let mut encoding = None;

    for (key, value) in fields {
        match key.to_ascii_lowercase().as_str() {
            "index" | "idx" => index = parse_index(value)?,
            "type" => value_type = Some(expect_str(key, value)?),
            "data" => data = Some(expect_str(key, value)?),
            "permissions" => {
                let perms = expect_str(key, value)?
                    .parse::<Permissions>()
                    .map_err(|e| e.to_string())?;
                permissions = Some(perms);
            }
            "ttl" => {
                let secs = value
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| "field 'ttl' must be a non-negative integer".to_string())?;
                ttl_secs = Some(secs);
            }
            "ttl_type" => ttl_kind = Some(expect_str(key, value)?),
            "encoding" => match expect_str(key, value)? {
                BASE64_ENCODING => encoding = Some(BASE64_ENCODING),
                other => return Err(format!("unknown encoding '{}'", other)),
            },
            "timestamp" => {
                let raw = expect_str(key, value)?;
                let parsed = DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))?;
                timestamp = Some(parsed.with_timezone(&Utc));
            }
            _ => return Err(format!("unrecognized field '{}'", key)),
        }
    }

    let (Some(value_type), Some(data)) = (value_type, data) else {
        return Err("must specify type and data".to_string());
    };

    let data = if is_binary_type(value_type) || encoding.is_some() {
        BASE64
            .decode(data)
            .map_err(|e| format!("data of {} value is not valid base64: {}", value_type, e))?
    } else {
        data.as_bytes().to_vec()
    };

    let ttl = match (ttl_kind, ttl_secs) {
        (None | Some("relative"), secs) => Ttl::Relative(secs.unwrap_or(Ttl::default().seconds())),
        (Some("absolute"), Some(secs)) => Ttl::Absolute(secs),
        (Some("absolute"), None) => return Err("absolute ttl_type requires 'ttl'".to_string()),
        (Some(other), _) => return Err(format!("unknown ttl_type '{}'", other)),
    };

    let mut record = ValueRecord::new(index, value_type, data).with_ttl(ttl);
    if let Some(permissions) = permissions {
        record = record.with_permissions(permissions);
    }
    if let Some(timestamp) = timestamp {
        record = record.with_timestamp(timestamp);
    }
    Ok(record)
}

fn parse_index(value: &Value) -> Result<u32, String> {
    match value.as_i64() {
        Some(index) if index < 0 => Err(format!(
            "illegal index value ({}), must be non-negative",
            index
        )),
        Some(index) => u32::try_from(index).map_err(|_| format!("index {} out of range", index)),
        None if value.is_u64() => Err(format!("index {} out of range", value)),
        None => Err("field 'index' must be an integer".to_string()),
    }
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("field '{}' must be a string", key))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
