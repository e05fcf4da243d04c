//! In-memory [`BulkTransport`] that records every call, for tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::BulkTransport;

/// One observed transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Bulk { target: String, payload: Vec<u8> },
    Refresh { target: String },
    Close,
}

#[derive(Debug, Default)]
struct Failures {
    bulk: usize,
    refresh: bool,
    close: bool,
}

/// Clones share the same call log, so a test can keep a handle after
/// moving the transport into a writer.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingTransport {
    calls: Arc<Mutex<Vec<Call>>>,
    failures: Arc<Mutex<Failures>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` bulk calls fail.
    pub(crate) fn fail_next_bulks(&self, n: usize) {
        self.failures.lock().bulk = n;
    }

    pub(crate) fn fail_refresh(&self) {
        self.failures.lock().refresh = true;
    }

    pub(crate) fn fail_close(&self) {
        self.failures.lock().close = true;
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Payload sizes of recorded bulk calls, in order.
    pub(crate) fn bulk_sizes(&self) -> Vec<usize> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Bulk { payload, .. } => Some(payload.len()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn bulk_payloads(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Bulk { payload, .. } => Some(String::from_utf8_lossy(payload).into_owned()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl BulkTransport for RecordingTransport {
    async fn bulk(&self, target: &str, payload: &[u8]) -> anyhow::Result<()> {
        {
            let mut failures = self.failures.lock();
            if failures.bulk > 0 {
                failures.bulk -= 1;
                anyhow::bail!("injected bulk failure");
            }
        }
        self.calls.lock().push(Call::Bulk {
            target: target.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn refresh(&self, target: &str) -> anyhow::Result<()> {
        if self.failures.lock().refresh {
            anyhow::bail!("injected refresh failure");
        }
        self.calls.lock().push(Call::Refresh {
            target: target.to_string(),
        });
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.calls.lock().push(Call::Close);
        if self.failures.lock().close {
            anyhow::bail!("injected close failure");
        }
        Ok(())
    }
}
