//! Buffered bulk writer.
//!
//! [`BulkWriter`] serializes records into bulk action fragments, accumulates
//! them in a [`BatchBuffer`], and flushes through a [`BulkTransport`] when the
//! byte capacity or entry threshold is reached.
//!
//! Lifecycle: `new` -> (`index` | `delete` | `dispatch`)* -> `close`.
//! `close` consumes the writer, so no operation can follow it.
//!
//! A writer has a single owner and performs no locking. Every call that
//! triggers a flush awaits the bulk request before returning.

use docbulk_core::{
    delete_fragment, index_fragment, BatchBuffer, BulkError, IdMode, Operation, OperationType,
    Record, Result,
};
use tracing::{debug, info, warn};

use crate::config::WriterConfig;
use crate::transport::BulkTransport;

/// Counters describing what a writer has sent so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Operations accepted into the buffer.
    pub operations: u64,
    /// Successful bulk requests.
    pub bulk_requests: u64,
    /// Payload bytes delivered by successful bulk requests.
    pub bytes_flushed: u64,
    /// Whether a refresh was issued on close.
    pub refreshed: bool,
}

/// Single-owner buffered writer bound to one target collection.
pub struct BulkWriter<T: BulkTransport> {
    transport: T,
    buffer: BatchBuffer,
    target: String,
    operation: OperationType,
    id_mode: IdMode,
    refresh_after_write: bool,
    executed_bulk_write: bool,
    stats: WriterStats,
    closed: bool,
}

impl<T: BulkTransport> BulkWriter<T> {
    /// Allocates the batch buffer and binds the writer to `config.target`.
    ///
    /// # Errors
    ///
    /// Returns [`BulkError::Configuration`] if the batch size is zero.
    pub fn new(config: &WriterConfig, transport: T) -> Result<Self> {
        let buffer = BatchBuffer::new(config.batch_size_bytes, config.batch_size_entries)?;
        debug!(
            collection = %config.target,
            operation = %config.operation,
            id_field = %config.id_field,
            capacity = config.batch_size_bytes,
            entry_threshold = config.batch_size_entries,
            "bulk writer opened"
        );
        Ok(Self {
            transport,
            buffer,
            target: config.target.clone(),
            operation: config.operation,
            id_mode: config.id_mode(),
            refresh_after_write: config.refresh_after_write,
            executed_bulk_write: false,
            stats: WriterStats::default(),
            closed: false,
        })
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn buffered_entries(&self) -> usize {
        self.buffer.entries()
    }

    #[must_use]
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Routes `record` to [`index`](Self::index) or [`delete`](Self::delete)
    /// according to the configured operation type.
    ///
    /// # Errors
    ///
    /// See [`index`](Self::index) and [`delete`](Self::delete).
    pub async fn dispatch(&mut self, record: impl Into<Record>) -> Result<()> {
        match self.operation {
            OperationType::Index => self.index(record).await,
            OperationType::Delete => self.delete(record).await,
        }
    }

    /// Buffers an index action for `record`, flushing as thresholds require.
    ///
    /// # Errors
    ///
    /// [`BulkError::Configuration`] for an empty target,
    /// [`BulkError::MalformedRecord`] / [`BulkError::Encoding`] for bad input,
    /// [`BulkError::OversizedOperation`] if the action can never fit, and
    /// [`BulkError::Flush`] if the batch could not be sent to make room.
    /// Any error means the record was not buffered, so the call can be
    /// retried as a whole.
    pub async fn index(&mut self, record: impl Into<Record>) -> Result<()> {
        self.ensure_target()?;
        let doc = record.into().into_document()?;
        let op = index_fragment(doc, &self.id_mode)?;
        self.enqueue(op).await
    }

    /// Buffers a delete action for `record`, flushing as thresholds require.
    ///
    /// # Errors
    ///
    /// [`BulkError::Configuration`] if ids are target-assigned (nothing is
    /// buffered), otherwise as for [`index`](Self::index).
    pub async fn delete(&mut self, record: impl Into<Record>) -> Result<()> {
        self.ensure_target()?;
        let doc = record.into().into_document()?;
        let op = delete_fragment(doc, &self.id_mode)?;
        self.enqueue(op).await
    }

    /// Sends the buffered batch as one bulk request.
    ///
    /// Does nothing when the buffer is empty. On failure the batch stays
    /// buffered, so calling `flush` again retries the same request.
    ///
    /// # Errors
    ///
    /// Returns [`BulkError::Flush`] if the transport rejects the request.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let bytes = self.buffer.len();
        let entries = self.buffer.entries();

        if let Err(source) = self.transport.bulk(&self.target, self.buffer.as_bytes()).await {
            return Err(BulkError::Flush {
                target: self.target.clone(),
                retained_bytes: bytes,
                retained_entries: entries,
                source,
            });
        }

        self.buffer.reset();
        self.executed_bulk_write = true;
        self.stats.bulk_requests += 1;
        self.stats.bytes_flushed += bytes as u64;
        info!(collection = %self.target, bytes, entries, "flushed bulk batch");
        Ok(())
    }

    /// Flushes what is left, refreshes the target if configured and anything
    /// was written, then closes the transport.
    ///
    /// The transport is closed even when the final flush or the refresh
    /// fails. The first error is returned and later ones are logged.
    ///
    /// # Errors
    ///
    /// [`BulkError::Flush`] for the final batch, [`BulkError::Transport`] for
    /// refresh or close failures.
    pub async fn close(mut self) -> Result<WriterStats> {
        self.closed = true;
        let mut first_error = None;

        if let Err(err) = self.flush().await {
            warn!(
                collection = %self.target,
                entries = self.buffer.entries(),
                "final flush failed; buffered operations are dropped"
            );
            first_error = Some(err);
        }

        if first_error.is_none() && self.refresh_after_write && self.executed_bulk_write {
            match self.transport.refresh(&self.target).await {
                Ok(()) => {
                    self.stats.refreshed = true;
                    info!(collection = %self.target, "refreshed target");
                }
                Err(err) => first_error = Some(BulkError::Transport(err)),
            }
        }

        if let Err(err) = self.transport.close().await {
            if first_error.is_some() {
                warn!(collection = %self.target, error = %err, "transport close failed");
            } else {
                first_error = Some(BulkError::Transport(err));
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                debug!(collection = %self.target, stats = ?self.stats, "bulk writer closed");
                Ok(self.stats)
            }
        }
    }

    fn ensure_target(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(BulkError::configuration("no target collection given"));
        }
        Ok(())
    }

    async fn enqueue(&mut self, op: Operation) -> Result<()> {
        let len = op.len();
        if !self.buffer.fits_at_all(len) {
            return Err(BulkError::OversizedOperation {
                len,
                capacity: self.buffer.capacity(),
            });
        }

        // Make room first; the buffer is never written past capacity. A batch
        // left at the entry threshold by a failed flush also goes out here.
        if self.buffer.would_overflow(len) || self.buffer.should_flush_by_count() {
            self.flush().await?;
        }

        self.buffer.append(op.bytes())?;
        self.stats.operations += 1;
        debug!(
            kind = %op.kind(),
            len,
            size = self.buffer.len(),
            entries = self.buffer.entries(),
            "buffered operation"
        );

        // The operation is accepted at this point. A failure here keeps the
        // batch, which the next operation or `close` sends again.
        if self.buffer.should_flush_by_count() {
            if let Err(err) = self.flush().await {
                warn!(
                    collection = %self.target,
                    error = %err,
                    "count-triggered flush failed; batch kept for retry"
                );
            }
        }
        Ok(())
    }
}

impl<T: BulkTransport> Drop for BulkWriter<T> {
    fn drop(&mut self) {
        if !self.closed && !self.buffer.is_empty() {
            warn!(
                collection = %self.target,
                entries = self.buffer.entries(),
                bytes = self.buffer.len(),
                "bulk writer dropped without close; buffered operations are lost"
            );
        }
    }
}

/// Writes every record through `writer` and always closes it.
///
/// If a record fails, the writer is still closed (flushing what was
/// accepted) before the record's error is returned.
///
/// # Errors
///
/// The first error from dispatching a record, or from closing the writer.
pub async fn write_all<T, I>(mut writer: BulkWriter<T>, records: I) -> Result<WriterStats>
where
    T: BulkTransport,
    I: IntoIterator,
    I::Item: Into<Record>,
{
    for record in records {
        if let Err(err) = writer.dispatch(record).await {
            if let Err(close_err) = writer.close().await {
                warn!(error = %close_err, "closing writer after failed operation also failed");
            }
            return Err(err);
        }
    }
    writer.close().await
}
