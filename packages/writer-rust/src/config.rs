//! Writer configuration.
//!
//! [`WriterConfig`] can be built directly, from a flat property map using
//! the `es.*` keys, or from command-line arguments via [`WriterArgs`].

use std::collections::HashMap;
use std::time::Duration;

use clap::{ArgAction, Args};
use docbulk_core::{BulkError, IdMode, OperationType, Result, TARGET_ASSIGNED_ID};

pub const PROP_RESOURCE: &str = "es.resource";
pub const PROP_OPERATION: &str = "es.operation";
pub const PROP_MAPPING_ID: &str = "es.mapping.id";
pub const PROP_BATCH_SIZE_BYTES: &str = "es.batch.size.bytes";
pub const PROP_BATCH_SIZE_ENTRIES: &str = "es.batch.size.entries";
pub const PROP_BATCH_WRITE_REFRESH: &str = "es.batch.write.refresh";
pub const PROP_NODES: &str = "es.nodes";

const DEFAULT_NODES: &str = "http://localhost:9200";

/// Settings for one [`BulkWriter`](crate::BulkWriter) instance.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Target collection (`index` or `index/type`). Must be non-empty to write.
    pub target: String,
    /// Action that `dispatch` routes records to.
    pub operation: OperationType,
    /// Record field carrying the document id, or `"_id"` for target-assigned ids.
    pub id_field: String,
    /// Batch buffer capacity in bytes.
    pub batch_size_bytes: usize,
    /// Entry count that triggers a flush. 0 disables the check.
    pub batch_size_entries: usize,
    /// Refresh the target on close if any batch was written.
    pub refresh_after_write: bool,
    /// Node URL used by the HTTP transport.
    pub nodes: String,
    /// Per-request timeout used by the HTTP transport.
    pub request_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            operation: OperationType::Index,
            id_field: TARGET_ASSIGNED_ID.to_string(),
            batch_size_bytes: 1024 * 1024, // 1 MiB
            batch_size_entries: 0,
            refresh_after_write: true,
            nodes: DEFAULT_NODES.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl WriterConfig {
    /// Config for `target` with every other setting at its default.
    #[must_use]
    pub fn for_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn id_mode(&self) -> IdMode {
        IdMode::from_field(&self.id_field)
    }

    /// Reads recognized `es.*` keys from `props`; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`BulkError::Configuration`] if a recognized key holds an
    /// unparseable value.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = props.get(PROP_RESOURCE) {
            config.target = v.trim().to_string();
        }
        if let Some(v) = props.get(PROP_OPERATION) {
            config.operation = v.parse()?;
        }
        if let Some(v) = props.get(PROP_MAPPING_ID) {
            config.id_field = v.trim().to_string();
        }
        if let Some(v) = props.get(PROP_BATCH_SIZE_BYTES) {
            config.batch_size_bytes = parse_byte_size(v)?;
        }
        if let Some(v) = props.get(PROP_BATCH_SIZE_ENTRIES) {
            config.batch_size_entries = v.trim().parse().map_err(|_| {
                BulkError::configuration(format!("{PROP_BATCH_SIZE_ENTRIES}: '{v}' is not a count"))
            })?;
        }
        if let Some(v) = props.get(PROP_BATCH_WRITE_REFRESH) {
            config.refresh_after_write = parse_bool(PROP_BATCH_WRITE_REFRESH, v)?;
        }
        if let Some(v) = props.get(PROP_NODES) {
            config.nodes = v.trim().to_string();
        }

        Ok(config)
    }
}

/// Parses sizes such as `1024`, `512kb`, `10mb`, `1gb` (case-insensitive).
///
/// # Errors
///
/// Returns [`BulkError::Configuration`] for unknown units, non-numeric
/// amounts, or sizes that overflow `usize`.
pub fn parse_byte_size(text: &str) -> Result<usize> {
    let lower = text.trim().to_ascii_lowercase();
    let (amount, multiplier) = if let Some(n) = lower.strip_suffix("gb") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = lower.strip_suffix("mb") {
        (n, 1024 * 1024)
    } else if let Some(n) = lower.strip_suffix("kb") {
        (n, 1024)
    } else if let Some(n) = lower.strip_suffix('b') {
        (n, 1)
    } else {
        (lower.as_str(), 1)
    };

    amount
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| BulkError::configuration(format!("'{text}' is not a valid byte size")))
}

fn parse_bool(key: &str, text: &str) -> Result<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(BulkError::configuration(format!(
            "{key}: '{text}' is not 'true' or 'false'"
        ))),
    }
}

/// Command-line / environment form of [`WriterConfig`].
#[derive(Debug, Clone, Args)]
pub struct WriterArgs {
    /// Target collection, `index` or `index/type`.
    #[arg(long, env = "ES_RESOURCE")]
    pub resource: String,

    /// `index` or `delete`.
    #[arg(long, env = "ES_OPERATION", default_value = "index")]
    pub operation: OperationType,

    /// Record field holding the document id; `_id` lets the target assign ids.
    #[arg(long, env = "ES_MAPPING_ID", default_value = TARGET_ASSIGNED_ID)]
    pub id_field: String,

    /// Batch capacity, e.g. `1mb`.
    #[arg(long, env = "ES_BATCH_SIZE_BYTES", default_value = "1mb", value_parser = parse_byte_size)]
    pub batch_size_bytes: usize,

    /// Entries per batch; 0 disables the count limit.
    #[arg(long, env = "ES_BATCH_SIZE_ENTRIES", default_value_t = 0)]
    pub batch_size_entries: usize,

    /// Refresh the target after writing.
    #[arg(long, env = "ES_BATCH_WRITE_REFRESH", default_value_t = true, action = ArgAction::Set)]
    pub refresh: bool,

    /// Node URL.
    #[arg(long, env = "ES_NODES", default_value = DEFAULT_NODES)]
    pub nodes: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

impl From<WriterArgs> for WriterConfig {
    fn from(args: WriterArgs) -> Self {
        Self {
            target: args.resource,
            operation: args.operation,
            id_field: args.id_field,
            batch_size_bytes: args.batch_size_bytes,
            batch_size_entries: args.batch_size_entries,
            refresh_after_write: args.refresh,
            nodes: args.nodes,
            request_timeout: Duration::from_secs(args.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        writer: WriterArgs,
    }

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn writer_config_defaults() {
        let config = WriterConfig::default();
        assert!(config.target.is_empty());
        assert_eq!(config.operation, OperationType::Index);
        assert_eq!(config.id_field, "_id");
        assert_eq!(config.id_mode(), IdMode::TargetAssigned);
        assert_eq!(config.batch_size_bytes, 1_048_576);
        assert_eq!(config.batch_size_entries, 0);
        assert!(config.refresh_after_write);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn properties_override_defaults() {
        let config = WriterConfig::from_properties(&props(&[
            (PROP_RESOURCE, "logs/event"),
            (PROP_OPERATION, "delete"),
            (PROP_MAPPING_ID, "rid"),
            (PROP_BATCH_SIZE_BYTES, "10mb"),
            (PROP_BATCH_SIZE_ENTRIES, "500"),
            (PROP_BATCH_WRITE_REFRESH, "false"),
            (PROP_NODES, "http://es:9200"),
            ("es.unrelated", "ignored"),
        ]))
        .unwrap();
        assert_eq!(config.target, "logs/event");
        assert_eq!(config.operation, OperationType::Delete);
        assert_eq!(config.id_mode(), IdMode::Field("rid".to_string()));
        assert_eq!(config.batch_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.batch_size_entries, 500);
        assert!(!config.refresh_after_write);
        assert_eq!(config.nodes, "http://es:9200");
    }

    #[test]
    fn bad_property_values_are_configuration_errors() {
        for (key, value) in [
            (PROP_OPERATION, "upsert"),
            (PROP_BATCH_SIZE_BYTES, "lots"),
            (PROP_BATCH_SIZE_ENTRIES, "-1"),
            (PROP_BATCH_WRITE_REFRESH, "maybe"),
        ] {
            let result = WriterConfig::from_properties(&props(&[(key, value)]));
            assert!(
                matches!(result, Err(BulkError::Configuration(_))),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn byte_sizes_parse_units() {
        assert_eq!(parse_byte_size("1024").unwrap(), 1024);
        assert_eq!(parse_byte_size("100b").unwrap(), 100);
        assert_eq!(parse_byte_size("512KB").unwrap(), 512 * 1024);
        assert_eq!(parse_byte_size(" 10mb ").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_byte_size("1gb").unwrap(), 1024 * 1024 * 1024);
        assert!(parse_byte_size("mb").is_err());
        assert!(parse_byte_size("3tb").is_err());
    }

    #[test]
    fn args_convert_to_config() {
        let cli = TestCli::try_parse_from([
            "bulk-load",
            "--resource",
            "logs",
            "--operation",
            "delete",
            "--id-field",
            "rid",
            "--batch-size-bytes",
            "4kb",
            "--batch-size-entries",
            "10",
            "--refresh",
            "false",
        ])
        .unwrap();
        let config = WriterConfig::from(cli.writer);
        assert_eq!(config.target, "logs");
        assert_eq!(config.operation, OperationType::Delete);
        assert_eq!(config.id_field, "rid");
        assert_eq!(config.batch_size_bytes, 4096);
        assert_eq!(config.batch_size_entries, 10);
        assert!(!config.refresh_after_write);
    }
}
