//! Input record model.
//!
//! A [`Record`] arrives either as an ordered JSON mapping or as a
//! MessagePack-encoded wrapper. Both are resolved to a [`Document`] once, at
//! the writer boundary, via [`Record::into_document`].

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde_json::Value;
use tracing::trace;

use crate::error::{BulkError, Result};

/// Ordered key -> value mapping. Field order is preserved on output.
pub type Document = serde_json::Map<String, Value>;

/// Id-field value meaning "let the target store assign the id".
pub const TARGET_ASSIGNED_ID: &str = "_id";

/// Key under which the identifier travels in bulk action metadata.
pub const WIRE_ID_KEY: &str = "_id";

/// One logical entity to write.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Already-decoded ordered mapping.
    Mapping(Document),
    /// MessagePack-encoded map produced by an upstream serializer.
    Encoded(Bytes),
}

impl Record {
    /// Unwraps the record into its ordered mapping form.
    ///
    /// # Errors
    ///
    /// Returns [`BulkError::Encoding`] if an encoded payload cannot be decoded,
    /// or [`BulkError::MalformedRecord`] if it decodes to something other than a map.
    pub fn into_document(self) -> Result<Document> {
        match self {
            Self::Mapping(doc) => Ok(doc),
            Self::Encoded(raw) => {
                trace!(bytes = raw.len(), "decoding encoded record");
                match rmp_serde::from_slice::<Value>(&raw)? {
                    Value::Object(doc) => Ok(doc),
                    other => Err(BulkError::malformed(format!(
                        "encoded record is a {}, expected a map",
                        json_kind(&other)
                    ))),
                }
            }
        }
    }
}

impl From<Document> for Record {
    fn from(doc: Document) -> Self {
        Self::Mapping(doc)
    }
}

impl From<Bytes> for Record {
    fn from(raw: Bytes) -> Self {
        Self::Encoded(raw)
    }
}

/// Which bulk action `dispatch` routes records to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationType {
    #[default]
    Index,
    Delete,
}

impl FromStr for OperationType {
    type Err = BulkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "index" => Ok(Self::Index),
            "delete" => Ok(Self::Delete),
            other => Err(BulkError::configuration(format!(
                "unknown operation type '{other}' (expected 'index' or 'delete')"
            ))),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => f.write_str("index"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// How document identifiers are chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdMode {
    /// The target store assigns ids; the record's id field is never read.
    TargetAssigned,
    /// The named record field supplies the id.
    Field(String),
}

impl IdMode {
    /// Derives the mode from a configured id-field name.
    #[must_use]
    pub fn from_field(id_field: &str) -> Self {
        if id_field == TARGET_ASSIGNED_ID {
            Self::TargetAssigned
        } else {
            Self::Field(id_field.to_string())
        }
    }
}

/// Reads `field` from `doc` and renders it as the textual identifier.
///
/// # Errors
///
/// Returns [`BulkError::MalformedRecord`] if the field is absent or holds a
/// null, array, or object.
pub fn extract_id(doc: &Document, field: &str) -> Result<String> {
    match doc.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(BulkError::malformed(format!(
            "id field '{field}' holds a {}, expected a scalar",
            json_kind(other)
        ))),
        None => Err(BulkError::malformed(format!("id field '{field}' is missing"))),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
