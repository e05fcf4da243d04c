//! `docbulk` Writer — buffered bulk index/delete client for a remote document store.

pub mod config;
pub mod ndjson;
pub mod transport;
pub mod writer;

pub use config::{WriterArgs, WriterConfig};
pub use docbulk_core::{BulkError, Document, IdMode, OperationType, Record, Result};
pub use transport::{BulkTransport, HttpTransport};
pub use writer::{write_all, BulkWriter, WriterStats};
