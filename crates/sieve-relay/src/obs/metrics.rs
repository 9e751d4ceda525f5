//! Minimal metrics registry for the relay.
//!
//! Counter and histogram types with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors to keep deterministic
//! ordering. Histogram buckets are fixed in milliseconds since sink
//! round-trips are network-bound.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &[(String, String)]) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for an exact label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum over every label set matching `filter`.
    pub fn sum_where(&self, filter: impl Fn(&[(String, String)]) -> bool) -> u64 {
        self.map
            .iter()
            .filter(|r| filter(r.key().as_slice()))
            .map(|r| r.value().load(Ordering::Relaxed))
            .sum()
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str(r.key()), val);
        }
    }
}

// 1ms, 5ms, 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s
const BUCKETS_MILLIS: [u64; 9] = [1, 5, 10, 50, 100, 250, 500, 1_000, 5_000];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 9],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<Vec<(String, String)>, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration and increment cumulative buckets (millisecond scale).
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(AtomicHistogram::default);
        let millis = duration.as_millis() as u64;

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(millis, Ordering::Relaxed);

        for (i, &b) in BUCKETS_MILLIS.iter().enumerate() {
            if millis <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} histogram", name);
        for r in self.map.iter() {
            let hist = r.value();
            let labels = label_str(r.key());
            let prefix = if labels.is_empty() {
                String::new()
            } else {
                format!("{},", labels)
            };

            for (i, &le) in BUCKETS_MILLIS.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, count);

            let sum = hist.sum.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_sum{{{}}} {}", name, labels, sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", name, labels, count);
        }
    }
}

#[derive(Default)]
pub struct RelayMetrics {
    /// Events accepted by the ingest endpoint, by severity.
    pub events_received: CounterVec,
    /// Sampler verdicts, by decision and severity.
    pub sampler_decisions: CounterVec,
    /// Kept events lost because the flush buffer was full.
    pub buffer_overflows: CounterVec,
    /// Sink flushes, by sink and outcome.
    pub sink_flushes: CounterVec,
    pub sink_events: CounterVec,
    pub sink_flush_duration: HistogramVec, // In Milliseconds
    pub sampler_purged: CounterVec,
    draining: AtomicBool,
}

impl RelayMetrics {
    pub fn set_draining(&self) {
        self.draining.store(true, Ordering::Relaxed);
    }
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }

    /// Kept/dropped totals across all decisions.
    pub fn decision_totals(&self) -> (u64, u64) {
        let kept = self.sampler_decisions.sum_where(|k| {
            k.iter()
                .any(|(name, v)| name == "decision" && v.starts_with("keep"))
        });
        let dropped = self.sampler_decisions.sum_where(|k| {
            k.iter()
                .any(|(name, v)| name == "decision" && v.starts_with("drop"))
        });
        (kept, dropped)
    }

    /// Render all registered metrics plus any extra gauge lines provided by callers.
    pub fn render(&self, extra: &[(&str, u64)]) -> String {
        let mut out = String::new();
        self.events_received.render("sieve_events_received_total", &mut out);
        self.sampler_decisions.render("sieve_sampler_decisions_total", &mut out);
        self.buffer_overflows.render("sieve_buffer_overflows_total", &mut out);
        self.sink_flushes.render("sieve_sink_flushes_total", &mut out);
        self.sink_events.render("sieve_sink_events_total", &mut out);
        self.sink_flush_duration.render("sieve_sink_flush_duration_millis", &mut out);
        self.sampler_purged.render("sieve_sampler_purged_total", &mut out);

        let _ = writeln!(
            out,
            "# TYPE sieve_draining gauge\nsieve_draining {}",
            if self.is_draining() { 1 } else { 0 }
        );
        for (k, v) in extra {
            let _ = writeln!(out, "# TYPE {} gauge\n{} {}", k, k, v);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_totals_split_keep_and_drop() {
        let m = RelayMetrics::default();
        m.sampler_decisions.inc(&[("decision", "keep_priority"), ("severity", "critical")]);
        m.sampler_decisions.add(&[("severity", "low"), ("decision", "drop_sampled")], 9);
        m.sampler_decisions.inc(&[("decision", "keep_sampled"), ("severity", "low")]);

        assert_eq!(m.decision_totals(), (2, 9));
        assert_eq!(
            m.sampler_decisions.get(&[("severity", "low"), ("decision", "drop_sampled")]),
            9
        );
    }

    #[test]
    fn render_includes_labels_and_extra() {
        let m = RelayMetrics::default();
        m.sink_flushes.inc(&[("sink", "http"), ("outcome", "error")]);
        m.sink_flush_duration.observe(&[("sink", "http")], Duration::from_millis(7));

        let out = m.render(&[("sieve_sampler_tracked_keys", 3)]);
        assert!(out.contains("sieve_sink_flushes_total{outcome=\"error\",sink=\"http\"} 1"));
        assert!(out.contains("sieve_sink_flush_duration_millis_bucket{sink=\"http\",le=\"10\"} 1"));
        assert!(out.contains("sieve_sink_flush_duration_millis_bucket{sink=\"http\",le=\"5\"} 0"));
        assert!(out.contains("sieve_sampler_tracked_keys 3"));
        assert!(out.contains("sieve_draining 0"));
    }
}
