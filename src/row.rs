//! Decoded log records
//!
//! A [`Row`] is one JSON-line record: the decoded field map, or an in-band
//! [`RowError`] when the line could not be turned into one.

use serde_json::{Map, Value};
use std::borrow::Cow;
use thiserror::Error;

/// Recoverable per-record faults, delivered in-band instead of field data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("invalid JSON row: {0}")]
    Decode(String),

    #[error("line is overlong")]
    Overlong,

    #[error("read failed: {0}")]
    Read(String),

    #[error("file notification failed: {0}")]
    Watch(String),
}

/// One decoded log record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    data: Map<String, Value>,
    error: Option<RowError>,
}

impl Row {
    pub fn from_data(data: Map<String, Value>) -> Self {
        Self { data, error: None }
    }

    pub fn from_error(error: RowError) -> Self {
        Self {
            data: Map::new(),
            error: Some(error),
        }
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn error(&self) -> Option<&RowError> {
        self.error.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Copy of this row with lowercased keys and lowercased string forms of
    /// every value. Used by the case-insensitive filter wrapper.
    pub(crate) fn to_lowercase(&self) -> Row {
        let data = self
            .data
            .iter()
            .map(|(key, value)| {
                (
                    key.to_lowercase(),
                    Value::String(canonical_string(value).to_lowercase()),
                )
            })
            .collect();
        Row {
            data,
            error: self.error.clone(),
        }
    }
}

/// String view of a JSON value shared by every string-based comparison.
///
/// Numbers print without trailing zeros (`56.78`, `123`, `1` for `1.0`),
/// strings are returned verbatim and nested values as compact JSON.
pub fn canonical_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cow::Owned(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Cow::Owned(u.to_string())
            } else {
                // f64 Display never uses exponent notation or trailing zeros
                Cow::Owned(n.as_f64().map(|f| f.to_string()).unwrap_or_default())
            }
        }
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Null => Cow::Borrowed("null"),
        Value::Array(_) | Value::Object(_) => Cow::Owned(value.to_string()),
    }
}
