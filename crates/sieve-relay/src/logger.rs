//! Security event logger.
//!
//! `SecurityLogger::log` is the synchronous call site of the sampler: it
//! sanitizes the event, asks the sampler for a verdict, and hands kept events
//! to the flusher over a bounded channel without ever blocking. The flusher
//! task batches events and pushes them to the sink; sink failures end there.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

use sieve_core::sanitize::sanitize_event;
use sieve_core::{Decision, EventRecord, Sampler};

use crate::config::SinkSection;
use crate::obs::RelayMetrics;
use crate::sink::TelemetrySink;

pub struct SecurityLogger {
    sampler: Arc<Sampler>,
    tx: mpsc::Sender<EventRecord>,
    metrics: Arc<RelayMetrics>,
}

impl SecurityLogger {
    /// Create a logger and the receiving end for [`run_flusher`].
    pub fn new(
        sampler: Arc<Sampler>,
        metrics: Arc<RelayMetrics>,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<EventRecord>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { sampler, tx, metrics }, rx)
    }

    pub fn sampler(&self) -> &Arc<Sampler> {
        &self.sampler
    }

    /// Sample and enqueue one event. Never blocks and never fails.
    pub fn log(&self, mut event: EventRecord) -> Decision {
        sanitize_event(&mut event);

        let rate = self.sampler.config().default_sampling_rate;
        let decision = self.sampler.evaluate(&event, rate);
        let severity = event.severity.as_str();
        self.metrics
            .sampler_decisions
            .inc(&[("decision", decision.as_str()), ("severity", severity)]);

        if decision.is_keep() {
            match self.tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(ev)) => {
                    self.metrics.buffer_overflows.inc(&[("severity", severity)]);
                    tracing::warn!(
                        event_type = %ev.event_type,
                        severity,
                        "flush buffer full, event lost"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::warn!(severity, "flusher stopped, event lost");
                }
            }
        }
        decision
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FlushSettings {
    pub max_batch: usize,
    pub flush_interval: Duration,
}

impl From<&SinkSection> for FlushSettings {
    fn from(cfg: &SinkSection) -> Self {
        Self {
            max_batch: cfg.max_batch.max(1),
            flush_interval: Duration::from_millis(cfg.flush_interval_ms),
        }
    }
}

/// Batch events from `rx` into `sink` until shutdown or channel close,
/// then flush whatever is still queued.
pub async fn run_flusher(
    mut rx: mpsc::Receiver<EventRecord>,
    sink: Arc<dyn TelemetrySink>,
    settings: FlushSettings,
    metrics: Arc<RelayMetrics>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut batch: Vec<EventRecord> = Vec::with_capacity(settings.max_batch);

    let mut tick = tokio::time::interval(settings.flush_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tick.tick().await;

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            maybe_ev = rx.recv() => {
                match maybe_ev {
                    Some(ev) => {
                        batch.push(ev);
                        if batch.len() >= settings.max_batch {
                            flush(sink.as_ref(), &mut batch, &metrics).await;
                        }
                    }
                    None => break,
                }
            }

            _ = tick.tick() => {
                if !batch.is_empty() {
                    flush(sink.as_ref(), &mut batch, &metrics).await;
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    while let Ok(ev) = rx.try_recv() {
        batch.push(ev);
        if batch.len() >= settings.max_batch {
            flush(sink.as_ref(), &mut batch, &metrics).await;
        }
    }
    if !batch.is_empty() {
        flush(sink.as_ref(), &mut batch, &metrics).await;
    }
    tracing::info!(sink = sink.name(), "flusher stopped");
}

async fn flush(sink: &dyn TelemetrySink, batch: &mut Vec<EventRecord>, metrics: &RelayMetrics) {
    let started = Instant::now();
    let count = batch.len();
    let name = sink.name();

    let outcome = match sink.send(batch).await {
        Ok(()) => {
            metrics.sink_events.add(&[("sink", name)], count as u64);
            "ok"
        }
        Err(e) => {
            tracing::debug!(
                sink = name,
                events = count,
                error = %e,
                "sink flush failed, batch discarded"
            );
            "error"
        }
    };

    metrics.sink_flushes.inc(&[("sink", name), ("outcome", outcome)]);
    metrics
        .sink_flush_duration
        .observe(&[("sink", name)], started.elapsed());
    batch.clear();
}
