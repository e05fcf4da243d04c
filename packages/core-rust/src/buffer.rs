//! Fixed-capacity byte accumulator for bulk batches.
//!
//! [`BatchBuffer`] knows nothing about wire formats. It copies fragments into
//! a region allocated once, counts entries, and answers whether a flush is
//! due. The owner performs the flush and then calls [`BatchBuffer::reset`].

use bytes::BytesMut;

use crate::error::{BulkError, Result};

/// Single-writer byte region of fixed capacity with a soft entry threshold.
///
/// Invariant: `len() <= capacity()` at all times.
#[derive(Debug)]
pub struct BatchBuffer {
    data: BytesMut,
    capacity: usize,
    entries: usize,
    entry_threshold: usize,
}

impl BatchBuffer {
    /// Allocates a buffer of `capacity` bytes.
    ///
    /// `entry_threshold` of 0 disables the count-based flush check.
    ///
    /// # Errors
    ///
    /// Returns [`BulkError::Configuration`] if `capacity` is 0.
    pub fn new(capacity: usize, entry_threshold: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(BulkError::configuration("batch size in bytes must be positive"));
        }
        Ok(Self {
            data: BytesMut::with_capacity(capacity),
            capacity,
            entries: 0,
            entry_threshold,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of fragments appended since the last reset.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    #[must_use]
    pub fn entry_threshold(&self) -> usize {
        self.entry_threshold
    }

    #[must_use]
    pub fn capacity_remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// `true` iff appending `n` bytes would reach or exceed capacity.
    ///
    /// The check is strict (`>=`), so a flush is forced before the region is
    /// ever filled to the last byte.
    #[must_use]
    pub fn would_overflow(&self, n: usize) -> bool {
        self.data.len().saturating_add(n) >= self.capacity
    }

    /// `true` iff a fragment of `n` bytes fits into an empty buffer.
    #[must_use]
    pub fn fits_at_all(&self, n: usize) -> bool {
        n < self.capacity
    }

    /// Copies `fragment` to the end of the buffered region and counts one entry.
    ///
    /// # Errors
    ///
    /// Returns [`BulkError::Overflow`] without mutating anything if the caller
    /// did not make room first.
    pub fn append(&mut self, fragment: &[u8]) -> Result<()> {
        if self.would_overflow(fragment.len()) {
            return Err(BulkError::Overflow {
                len: fragment.len(),
                size: self.data.len(),
                capacity: self.capacity,
            });
        }
        self.data.extend_from_slice(fragment);
        self.entries += 1;
        Ok(())
    }

    /// `true` iff the threshold is enabled and has been reached.
    #[must_use]
    pub fn should_flush_by_count(&self) -> bool {
        self.entry_threshold > 0 && self.entries >= self.entry_threshold
    }

    /// The buffered bytes, `0..len()`.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Empties the buffer. The allocation is kept.
    pub fn reset(&mut self) {
        self.data.clear();
        self.entries = 0;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(BatchBuffer::new(0, 0), Err(BulkError::Configuration(_))));
    }

    #[test]
    fn append_advances_size_and_entries() {
        let mut buf = BatchBuffer::new(100, 0).unwrap();
        buf.append(b"hello\n").unwrap();
        buf.append(b"world\n").unwrap();
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.entries(), 2);
        assert_eq!(buf.capacity_remaining(), 88);
        assert_eq!(buf.as_bytes(), b"hello\nworld\n");
    }

    #[test]
    fn overflow_check_is_strict() {
        let mut buf = BatchBuffer::new(10, 0).unwrap();
        buf.append(b"12345").unwrap();
        assert!(!buf.would_overflow(4));
        assert!(buf.would_overflow(5));
        assert!(!buf.fits_at_all(10));
        assert!(buf.fits_at_all(9));
    }

    #[test]
    fn append_refuses_to_overflow() {
        let mut buf = BatchBuffer::new(10, 0).unwrap();
        buf.append(b"123456").unwrap();
        let err = buf.append(b"7890").unwrap_err();
        assert!(matches!(err, BulkError::Overflow { len: 4, size: 6, capacity: 10 }));
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.entries(), 1);
    }

    #[test]
    fn count_threshold_disabled_at_zero() {
        let mut buf = BatchBuffer::new(1000, 0).unwrap();
        for _ in 0..50 {
            buf.append(b"x").unwrap();
        }
        assert!(!buf.should_flush_by_count());
    }

    #[test]
    fn count_threshold_triggers() {
        let mut buf = BatchBuffer::new(1000, 2).unwrap();
        buf.append(b"a").unwrap();
        assert!(!buf.should_flush_by_count());
        buf.append(b"b").unwrap();
        assert!(buf.should_flush_by_count());
    }

    #[test]
    fn reset_keeps_allocation() {
        let mut buf = BatchBuffer::new(64, 1).unwrap();
        buf.append(b"payload").unwrap();
        buf.reset();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.entries(), 0);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 64);
        assert!(buf.data.capacity() >= 64);
    }

    proptest! {
        /// Flush-before-append keeps the buffer within capacity for any sequence.
        #[test]
        fn size_never_exceeds_capacity(
            capacity in 1usize..512,
            sizes in proptest::collection::vec(0usize..600, 0..64),
        ) {
            let mut buf = BatchBuffer::new(capacity, 0).unwrap();
            for n in sizes {
                if !buf.fits_at_all(n) {
                    continue;
                }
                if buf.would_overflow(n) {
                    buf.reset();
                }
                buf.append(&vec![b'x'; n]).unwrap();
                prop_assert!(buf.len() < capacity);
            }
        }
    }
}
