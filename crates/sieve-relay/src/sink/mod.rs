//! Telemetry sinks.
//!
//! A sink receives batches of kept events. Delivery is fire-and-forget from
//! the logger's point of view: the flusher logs and counts failures, it
//! never retries and never reports them to callers of `SecurityLogger::log`.

pub mod http;
pub mod memory;
pub mod stdout;

use std::sync::Arc;

use async_trait::async_trait;
use sieve_core::error::Result;
use sieve_core::EventRecord;

use crate::config::{SinkKind, SinkSection};

pub use http::HttpSink;
pub use memory::{MemorySink, NullSink};
pub use stdout::StdoutSink;

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;
    async fn send(&self, events: &[EventRecord]) -> Result<()>;
}

/// Build the sink named by config.
pub fn build_sink(cfg: &SinkSection) -> Result<Arc<dyn TelemetrySink>> {
    Ok(match cfg.kind {
        SinkKind::Stdout => Arc::new(StdoutSink),
        SinkKind::Null => Arc::new(NullSink),
        SinkKind::Http => Arc::new(HttpSink::from_config(cfg)?),
    })
}
