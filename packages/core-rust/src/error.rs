//! Error type shared by the codec, the batch buffer, and the writer.

/// Result alias used throughout `docbulk`.
pub type Result<T> = std::result::Result<T, BulkError>;

/// Errors surfaced by bulk operations.
///
/// Every variant fails the in-progress `index` / `delete` / `flush` call.
/// Nothing is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    /// Writer settings are unusable (empty target, delete without an id field, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A record or document could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A record is missing a required field or has an unexpected shape.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A single operation is larger than the whole batch buffer.
    #[error("operation of {len} bytes can never fit a batch buffer of {capacity} bytes")]
    OversizedOperation { len: usize, capacity: usize },

    /// An append was attempted without first making room.
    #[error("append of {len} bytes would overflow buffer ({size}/{capacity} bytes used)")]
    Overflow {
        len: usize,
        size: usize,
        capacity: usize,
    },

    /// The transport failed outside of a flush (refresh or close).
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),

    /// A bulk request failed. The batch is still buffered.
    #[error("bulk request to '{target}' failed ({retained_entries} entries, {retained_bytes} bytes retained): {source}")]
    Flush {
        target: String,
        retained_bytes: usize,
        retained_entries: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl BulkError {
    /// Shorthand for [`BulkError::MalformedRecord`].
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Shorthand for [`BulkError::Configuration`].
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<serde_json::Error> for BulkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for BulkError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_error_mentions_retained_batch() {
        let err = BulkError::Flush {
            target: "logs".to_string(),
            retained_bytes: 80,
            retained_entries: 2,
            source: anyhow::anyhow!("connection refused"),
        };
        let msg = err.to_string();
        assert!(msg.contains("'logs'"));
        assert!(msg.contains("2 entries"));
        assert!(msg.contains("80 bytes"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn json_errors_map_to_encoding() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(BulkError::from(json_err), BulkError::Encoding(_)));
    }
}
