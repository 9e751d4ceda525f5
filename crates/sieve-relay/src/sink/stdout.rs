use async_trait::async_trait;
use sieve_core::error::Result;
use sieve_core::EventRecord;

use super::TelemetrySink;

/// Emits each event as a structured `tracing` line on the `sieve::events` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[async_trait]
impl TelemetrySink for StdoutSink {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn send(&self, events: &[EventRecord]) -> Result<()> {
        for ev in events {
            let details = ev
                .details
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default();
            tracing::info!(
                target: "sieve::events",
                event_type = %ev.event_type,
                severity = %ev.severity,
                timestamp = ev.timestamp,
                details = %details,
                "security event"
            );
        }
        Ok(())
    }
}
