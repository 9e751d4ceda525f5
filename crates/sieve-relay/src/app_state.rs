//! Shared application state for the sieve relay.
//!
//! Owns the sampler, the security logger, metrics, and the shutdown signal
//! observed by the background flusher and janitor tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use sieve_core::clock::SystemClock;
use sieve_core::error::Result;
use sieve_core::Sampler;

use crate::config::RelayConfig;
use crate::janitor::spawn_janitor;
use crate::logger::{run_flusher, FlushSettings, SecurityLogger};
use crate::obs::RelayMetrics;
use crate::sink::{build_sink, TelemetrySink};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: RelayConfig,
    logger: SecurityLogger,
    metrics: Arc<RelayMetrics>,
    shutdown: watch::Sender<bool>,
}

/// Handles of the background tasks; await them after draining.
pub struct Background {
    flusher: JoinHandle<()>,
    janitor: JoinHandle<()>,
}

impl Background {
    pub async fn join(self) {
        if let Err(e) = self.flusher.await {
            tracing::error!(error = %e, "flusher task failed");
        }
        if let Err(e) = self.janitor.await {
            tracing::error!(error = %e, "janitor task failed");
        }
    }
}

impl AppState {
    /// Build state from config with the system clock and the configured sink.
    /// Must be called inside a tokio runtime.
    pub fn new(cfg: RelayConfig) -> Result<(Self, Background)> {
        let sink = build_sink(&cfg.sink)?;
        let sampler = Arc::new(Sampler::new(cfg.sampler.clone(), Arc::new(SystemClock)));
        Ok(Self::with_parts(cfg, sampler, sink))
    }

    /// Build state around an existing sampler and sink (tests, embedding).
    pub fn with_parts(
        cfg: RelayConfig,
        sampler: Arc<Sampler>,
        sink: Arc<dyn TelemetrySink>,
    ) -> (Self, Background) {
        let metrics = Arc::new(RelayMetrics::default());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let (logger, rx) =
            SecurityLogger::new(Arc::clone(&sampler), Arc::clone(&metrics), cfg.sink.buffer);

        tracing::info!(sink = sink.name(), "starting flusher");
        let flusher = tokio::spawn(run_flusher(
            rx,
            sink,
            FlushSettings::from(&cfg.sink),
            Arc::clone(&metrics),
            shutdown_rx.clone(),
        ));
        let janitor = spawn_janitor(
            sampler,
            Duration::from_millis(cfg.sampler.cleanup_interval_ms),
            Arc::clone(&metrics),
            shutdown_rx,
        );

        let state = Self {
            inner: Arc::new(AppStateInner {
                cfg,
                logger,
                metrics,
                shutdown,
            }),
        };
        (state, Background { flusher, janitor })
    }

    pub fn cfg(&self) -> &RelayConfig {
        &self.inner.cfg
    }

    pub fn logger(&self) -> &SecurityLogger {
        &self.inner.logger
    }

    pub fn sampler(&self) -> &Arc<Sampler> {
        self.inner.logger.sampler()
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.inner.metrics
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Refuse new ingest requests. Background tasks keep running so events
    /// from requests already past the draining check still reach the sink.
    pub fn set_draining(&self) {
        if !self.inner.metrics.is_draining() {
            self.inner.metrics.set_draining();
            tracing::info!("relay draining");
        }
    }

    /// Drain, then stop the flusher and janitor and wait for them. The
    /// flusher sends everything queued before it exits. Call only after the
    /// HTTP server has finished in-flight requests.
    pub async fn shutdown(&self, background: Background) {
        self.set_draining();
        let _ = self.inner.shutdown.send(true);
        background.join().await;
    }

    /// Extra gauge lines for `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![("sieve_sampler_tracked_keys", self.sampler().tracked_keys() as u64)]
    }
}
