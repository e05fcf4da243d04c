//! Reprojection of the nested `rdata` field.
//!
//! Upstream records carry `rdata` as the textual rendering of a flat map,
//! e.g. `(a=1, b=2)`. The target store wants a list of objects instead:
//!
//! ```text
//! "rdata": [{"mapid": "a", "value": "1"}, {"mapid": "b", "value": "2"}]
//! ```
//!
//! The textual parser is deliberately small and kept apart from the wire
//! codec. Values containing `,` are not representable in the textual form.

use serde_json::{json, Value};

use crate::error::{BulkError, Result};
use crate::record::{json_kind, Document};

/// Name of the reserved nested-structure field.
pub const RDATA_FIELD: &str = "rdata";

const DELIMITERS: [(char, char); 3] = [('(', ')'), ('{', '}'), ('[', ']')];

/// Parses a delimited `key=value` list such as `(a=1, b=2)` or `{a=1}`.
///
/// One matching pair of delimiters is stripped, tokens are split on
/// `,` and then on the first `=`. Keys and values are whitespace-trimmed.
///
/// # Errors
///
/// Returns [`BulkError::MalformedRecord`] if the text is not enclosed in
/// delimiters, or a token has no `=` or an empty key.
pub fn parse_pairs(text: &str) -> Result<Vec<(String, String)>> {
    let body = DELIMITERS
        .iter()
        .find_map(|&(open, close)| text.strip_prefix(open)?.strip_suffix(close))
        .ok_or_else(|| {
            BulkError::malformed(format!("{RDATA_FIELD} '{text}' is not a delimited key=value list"))
        })?;

    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    body.split(',')
        .map(|token| {
            let (key, value) = token.split_once('=').ok_or_else(|| {
                BulkError::malformed(format!("{RDATA_FIELD} entry '{}' has no '='", token.trim()))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(BulkError::malformed(format!(
                    "{RDATA_FIELD} entry '{}' has an empty key",
                    token.trim()
                )));
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Converts an `rdata` value into the list-of-objects shape.
///
/// Accepts either the textual form or an already-structured JSON object.
///
/// # Errors
///
/// Returns [`BulkError::MalformedRecord`] for any other value shape or an
/// unparseable textual form.
pub fn reproject(value: &Value) -> Result<Value> {
    let pairs = match value {
        Value::String(text) => parse_pairs(text)?,
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), scalar_text(v)))
            .collect(),
        other => {
            return Err(BulkError::malformed(format!(
                "{RDATA_FIELD} is a {}, expected text or an object",
                json_kind(other)
            )))
        }
    };

    Ok(Value::Array(
        pairs
            .into_iter()
            .map(|(key, value)| json!({ "mapid": map_id(&key), "value": value }))
            .collect(),
    ))
}

/// Replaces `rdata` in `doc` with its reprojection, moved to the last position.
///
/// The remaining fields keep their relative order.
///
/// # Errors
///
/// Returns [`BulkError::MalformedRecord`] if `rdata` is absent or malformed.
/// `doc` is left untouched on error.
pub fn attach_reprojected(doc: &mut Document) -> Result<()> {
    let raw = doc
        .get(RDATA_FIELD)
        .ok_or_else(|| BulkError::malformed(format!("field '{RDATA_FIELD}' is missing")))?;
    let projected = reproject(raw)?;
    doc.shift_remove(RDATA_FIELD);
    doc.insert(RDATA_FIELD.to_string(), projected);
    Ok(())
}

/// Integer keys become JSON numbers so numeric map ids stay numeric.
fn map_id(key: &str) -> Value {
    key.parse::<i64>()
        .map_or_else(|_| Value::String(key.to_string()), Value::from)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
