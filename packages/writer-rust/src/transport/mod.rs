//! Transport seam between the [`BulkWriter`](crate::BulkWriter) and the remote store.
//!
//! The writer never speaks HTTP itself. It hands finished batches to a
//! [`BulkTransport`], which is expected to treat each call as all-or-nothing.

pub mod http;
#[cfg(test)]
pub(crate) mod recording;

use async_trait::async_trait;

pub use http::HttpTransport;

/// Remote side of a bulk writer.
///
/// Implementations own their connections; timeouts are their concern.
#[async_trait]
pub trait BulkTransport: Send + Sync {
    /// Sends `payload` as one bulk request against `target`.
    async fn bulk(&self, target: &str, payload: &[u8]) -> anyhow::Result<()>;

    /// Makes recent writes to `target` visible to search.
    async fn refresh(&self, target: &str) -> anyhow::Result<()>;

    /// Releases underlying connections.
    async fn close(&self) -> anyhow::Result<()>;
}
