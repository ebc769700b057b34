//! In-memory sink for tests and embedding.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use futures_util::future::{self, BoxFuture};

use crate::export::batch::ExportBatch;
use crate::export::sink::{SinkError, TelemetrySink};
use crate::sync::lock;

/// Keeps every accepted batch. Can be switched into a failing mode that
/// rejects pushes with [`SinkError::Unavailable`].
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<ExportBatch>>,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Accepted batches, oldest first.
    pub fn batches(&self) -> Vec<ExportBatch> {
        lock(&self.batches).clone()
    }

    pub fn take(&self) -> Vec<ExportBatch> {
        std::mem::take(&mut *lock(&self.batches))
    }

    /// Pushes attempted, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl TelemetrySink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn export<'a>(&'a self, batch: &'a ExportBatch) -> BoxFuture<'a, Result<(), SinkError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(SinkError::Unavailable("memory sink set to fail".into()))
        } else {
            lock(&self.batches).push(batch.clone());
            Ok(())
        };
        Box::pin(future::ready(result))
    }
}
