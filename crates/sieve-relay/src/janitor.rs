//! Periodic purge of expired sampler state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use sieve_core::Sampler;

use crate::obs::RelayMetrics;

/// Run `Sampler::cleanup` every `period` until `shutdown` flips or its sender drops.
pub fn spawn_janitor(
    sampler: Arc<Sampler>,
    period: Duration,
    metrics: Arc<RelayMetrics>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tick.tick().await;

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = tick.tick() => {
                    let removed = sampler.cleanup();
                    if removed > 0 {
                        metrics.sampler_purged.add(&[], removed as u64);
                    }
                    tracing::debug!(removed, tracked = sampler.tracked_keys(), "janitor pass");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("janitor stopped");
    })
}
