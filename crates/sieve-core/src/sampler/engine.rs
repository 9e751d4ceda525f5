use std::sync::{Arc, Mutex};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::clock::Clock;
use crate::event::{sampling_key, EventRecord, Severity};

use super::config::SamplerConfig;

/// Outcome of evaluating one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// High/critical/error: always forwarded.
    KeepPriority,
    /// First sight of a non-sampled severity.
    KeepFirstSight,
    /// First sight of a sampled severity, won the 1-in-N roll.
    KeepSampled,
    /// First sight of a sampled severity, lost the 1-in-N roll.
    DropSampled,
    /// Repeat inside the current backoff window.
    DropSuppressed,
    /// Repeat after the backoff window; the window doubles.
    KeepWindowElapsed,
    /// First sight of a new key while `max_tracked_keys` are tracked.
    DropCapacity,
}

impl Decision {
    pub fn is_keep(self) -> bool {
        matches!(
            self,
            Decision::KeepPriority
                | Decision::KeepFirstSight
                | Decision::KeepSampled
                | Decision::KeepWindowElapsed
        )
    }

    /// Stable label for metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::KeepPriority => "keep_priority",
            Decision::KeepFirstSight => "keep_first_sight",
            Decision::KeepSampled => "keep_sampled",
            Decision::DropSampled => "drop_sampled",
            Decision::DropSuppressed => "drop_suppressed",
            Decision::KeepWindowElapsed => "keep_window_elapsed",
            Decision::DropCapacity => "drop_capacity",
        }
    }
}

/// Per-key bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingState {
    pub last_seen_at: u64,
    pub occurrence_count: u64,
    /// Power of two, `1..=max_multiplier`.
    pub backoff_multiplier: u32,
}

impl SamplingState {
    fn first(now: u64) -> Self {
        Self {
            last_seen_at: now,
            occurrence_count: 1,
            backoff_multiplier: 1,
        }
    }
}

/// Event sampler with exponential backoff per `eventType_severity` key.
///
/// Construct once and share via `Arc`. All methods take `&self`; each key's
/// read-modify-write happens under its `DashMap` shard lock, so concurrent
/// `evaluate` and `cleanup` calls are safe.
pub struct Sampler {
    cfg: SamplerConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    states: DashMap<String, SamplingState>,
}

impl Sampler {
    /// Sampler with an OS-seeded generator.
    pub fn new(cfg: SamplerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_rng(cfg, clock, Box::new(StdRng::from_os_rng()))
    }

    /// Sampler with an injected generator (seeded in tests).
    pub fn with_rng(
        cfg: SamplerConfig,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            cfg,
            clock,
            rng: Mutex::new(rng),
            states: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.cfg
    }

    /// Keep/drop using the configured default sampling rate.
    pub fn should_keep(&self, event: &EventRecord) -> bool {
        self.evaluate(event, self.cfg.default_sampling_rate).is_keep()
    }

    pub fn should_keep_with_rate(&self, event: &EventRecord, sampling_rate: u32) -> bool {
        self.evaluate(event, sampling_rate).is_keep()
    }

    pub fn evaluate(&self, event: &EventRecord, sampling_rate: u32) -> Decision {
        let now = self.clock.now_ms();

        if event.severity.is_priority() {
            self.reset_backoff(&event.event_type);
            return Decision::KeepPriority;
        }

        let key = event.sampling_key();

        // Checked before taking the entry: `len()` locks every shard.
        // Concurrent first sights may overshoot the ceiling slightly.
        if !self.states.contains_key(&key) && self.states.len() >= self.cfg.max_tracked_keys {
            tracing::debug!(
                event_type = %event.event_type,
                severity = %event.severity,
                max_tracked_keys = self.cfg.max_tracked_keys,
                "sampler at capacity, new key dropped"
            );
            return Decision::DropCapacity;
        }

        match self.states.entry(key) {
            Entry::Vacant(v) => {
                v.insert(SamplingState::first(now));
            }
            Entry::Occupied(mut o) => {
                let st = o.get_mut();
                // A clock that moved backwards counts as no time elapsed.
                let elapsed = now.saturating_sub(st.last_seen_at);
                let window = self.cfg.window_ms(st.backoff_multiplier);

                if elapsed < window {
                    st.occurrence_count += 1;
                    tracing::trace!(
                        event_type = %event.event_type,
                        severity = %event.severity,
                        occurrences = st.occurrence_count,
                        window_ms = window,
                        "event suppressed"
                    );
                    return Decision::DropSuppressed;
                }

                st.last_seen_at = now;
                st.occurrence_count = 1;
                st.backoff_multiplier = st
                    .backoff_multiplier
                    .saturating_mul(2)
                    .min(self.cfg.max_multiplier);
                return Decision::KeepWindowElapsed;
            }
        }

        if !self.cfg.is_sampled(event.severity) {
            return Decision::KeepFirstSight;
        }
        if self.roll(sampling_rate) {
            Decision::KeepSampled
        } else {
            Decision::DropSampled
        }
    }

    /// Purge keys idle for longer than twice the max backoff.
    /// Returns the number of removed keys.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let expiry = self.cfg.expiry_ms();
        let mut removed = 0usize;

        self.states.retain(|_, st| {
            let keep = now.saturating_sub(st.last_seen_at) <= expiry;
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            tracing::debug!(removed, remaining = self.states.len(), "sampler state purged");
        }
        removed
    }

    pub fn state(&self, event_type: &str, severity: Severity) -> Option<SamplingState> {
        self.states
            .get(&sampling_key(event_type, severity))
            .map(|r| *r.value())
    }

    pub fn tracked_keys(&self) -> usize {
        self.states.len()
    }

    // Priority events are never tracked under their own key, so the reset
    // targets the sampled/backed-off keys of the same event type.
    fn reset_backoff(&self, event_type: &str) {
        for sev in Severity::ALL.into_iter().filter(|s| !s.is_priority()) {
            if let Some(mut st) = self.states.get_mut(&sampling_key(event_type, sev)) {
                st.backoff_multiplier = 1;
            }
        }
    }

    fn roll(&self, sampling_rate: u32) -> bool {
        let rate = sampling_rate.max(1);
        if rate == 1 {
            return true;
        }
        // Poisoned lock means a panic elsewhere; keep rather than lose the event.
        match self.rng.lock() {
            Ok(mut rng) => rng.random_ratio(1, rate),
            Err(_) => true,
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("cfg", &self.cfg)
            .field("tracked_keys", &self.states.len())
            .finish()
    }
}
