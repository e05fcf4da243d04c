//! Bulk wire codec.
//!
//! Serializes documents into newline-delimited bulk action fragments:
//!
//! ```text
//! {"index":{}}\n<document>\n                 target-assigned id
//! {"index":{"_id":"42"}}\n<document>\n       explicit id
//! {"delete":{"_id":"42",...}}\n              delete
//! ```

use bytes::Bytes;
use serde_json::Value;

use crate::error::{BulkError, Result};
use crate::rdata::attach_reprojected;
use crate::record::{extract_id, Document, IdMode, OperationType, WIRE_ID_KEY};

const INDEX_HEADER_TARGET_ASSIGNED: &str = "{\"index\":{}}\n";

/// A serialized bulk action, ready to be appended to a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Action line plus document line.
    Index(Bytes),
    /// Single action line.
    Delete(Bytes),
}

impl Operation {
    /// The complete UTF-8 fragment, including trailing newlines.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Index(b) | Self::Delete(b) => b,
        }
    }

    /// Fragment length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    /// Always `false` for fragments produced by this module.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    #[must_use]
    pub fn kind(&self) -> OperationType {
        match self {
            Self::Index(_) => OperationType::Index,
            Self::Delete(_) => OperationType::Delete,
        }
    }
}

/// Builds an index fragment for `doc`.
///
/// In [`IdMode::TargetAssigned`] the id field is not read at all.
///
/// # Errors
///
/// Returns [`BulkError::MalformedRecord`] if the id field (explicit mode) or
/// `rdata` is missing or malformed, or [`BulkError::Encoding`] if the
/// document cannot be serialized.
pub fn index_fragment(mut doc: Document, id_mode: &IdMode) -> Result<Operation> {
    let mut out = match id_mode {
        IdMode::TargetAssigned => String::from(INDEX_HEADER_TARGET_ASSIGNED),
        IdMode::Field(field) => {
            let id = extract_id(&doc, field)?;
            let mut header = String::from("{\"index\":{\"_id\":");
            header.push_str(&serde_json::to_string(&id)?);
            header.push_str("}}\n");
            header
        }
    };

    attach_reprojected(&mut doc)?;
    out.push_str(&serde_json::to_string(&doc)?);
    out.push('\n');

    Ok(Operation::Index(Bytes::from(out)))
}

/// Builds a delete fragment for `doc`.
///
/// The id is copied to the wire id key, placed first; all other fields
/// follow in their original order.
///
/// # Errors
///
/// Returns [`BulkError::Configuration`] in [`IdMode::TargetAssigned`], since
/// a delete needs a caller-known id; [`BulkError::MalformedRecord`] if the id
/// field is missing; [`BulkError::Encoding`] on serialization failure.
pub fn delete_fragment(doc: Document, id_mode: &IdMode) -> Result<Operation> {
    let IdMode::Field(field) = id_mode else {
        return Err(BulkError::configuration(
            "delete requires an explicit id field; the configured id field lets the target assign ids",
        ));
    };

    let id = extract_id(&doc, field)?;
    let mut action = Document::new();
    action.insert(WIRE_ID_KEY.to_string(), Value::String(id));
    action.extend(doc.into_iter().filter(|(k, _)| k != WIRE_ID_KEY));

    let mut out = String::from("{\"delete\":");
    out.push_str(&serde_json::to_string(&action)?);
    out.push_str("}\n");

    Ok(Operation::Delete(Bytes::from(out)))
}
