use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sieve_core::error::{Result, SieveError};
use sieve_core::EventRecord;

use super::TelemetrySink;

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl TelemetrySink for NullSink {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn send(&self, _events: &[EventRecord]) -> Result<()> {
        Ok(())
    }
}

/// Collects batches in memory. Can be switched into a failing mode.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<EventRecord>>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn batches(&self) -> Vec<Vec<EventRecord>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl TelemetrySink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn send(&self, events: &[EventRecord]) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(SieveError::Sink("memory sink set to fail".into()));
        }
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| SieveError::Internal("memory sink lock poisoned".into()))?;
        batches.push(events.to_vec());
        Ok(())
    }
}
