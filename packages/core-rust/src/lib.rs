//! `docbulk` Core — record model, `rdata` reprojection, bulk wire codec, and batch buffer.

pub mod buffer;
pub mod error;
pub mod rdata;
pub mod record;
pub mod wire;

pub use buffer::BatchBuffer;
pub use error::{BulkError, Result};
pub use record::{Document, IdMode, OperationType, Record, TARGET_ASSIGNED_ID, WIRE_ID_KEY};
pub use wire::{delete_fragment, index_fragment, Operation};
