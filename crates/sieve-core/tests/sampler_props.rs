//! Behavioural properties of the rate-limited sampler.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::SeedableRng;

use sieve_core::clock::{Clock, ManualClock};
use sieve_core::{Decision, EventRecord, Sampler, SamplerConfig, Severity};

const T0: u64 = 1_700_000_000_000;
const MINUTE: u64 = 60_000;
const HOUR: u64 = 60 * MINUTE;

fn sampler_with(seed: u64) -> (Arc<ManualClock>, Sampler) {
    let clock = Arc::new(ManualClock::new(T0));
    let sampler = Sampler::with_rng(
        SamplerConfig::default(),
        clock.clone(),
        Box::new(StdRng::seed_from_u64(seed)),
    );
    (clock, sampler)
}

fn ev(event_type: &str, severity: Severity, clock: &ManualClock) -> EventRecord {
    EventRecord::new(event_type, severity, clock.now_ms())
}

#[test]
fn priority_severities_are_always_kept() {
    let (clock, sampler) = sampler_with(1);
    for sev in [Severity::High, Severity::Critical, Severity::Error] {
        for _ in 0..50 {
            clock.advance(1);
            assert!(sampler.should_keep(&ev("ping", sev, &clock)), "severity={sev}");
        }
    }
    // Priority events never create tracking state of their own.
    assert_eq!(sampler.tracked_keys(), 0);
}

#[test]
fn repeats_inside_window_are_suppressed() {
    let (clock, sampler) = sampler_with(2);

    assert_eq!(
        sampler.evaluate(&ev("csp_violation", Severity::Medium, &clock), 10),
        Decision::KeepFirstSight
    );

    clock.advance(1_000);
    assert!(!sampler.should_keep(&ev("csp_violation", Severity::Medium, &clock)));
    clock.set(T0 + MINUTE - 1);
    assert!(!sampler.should_keep(&ev("csp_violation", Severity::Medium, &clock)));

    let st = sampler.state("csp_violation", Severity::Medium).unwrap();
    assert_eq!(st.occurrence_count, 3);
    assert_eq!(st.last_seen_at, T0);

    clock.set(T0 + MINUTE);
    assert_eq!(
        sampler.evaluate(&ev("csp_violation", Severity::Medium, &clock), 10),
        Decision::KeepWindowElapsed
    );
    let st = sampler.state("csp_violation", Severity::Medium).unwrap();
    assert_eq!(st.occurrence_count, 1);
    assert_eq!(st.backoff_multiplier, 2);

    // Window is now two minutes.
    clock.advance(2 * MINUTE - 1);
    assert!(!sampler.should_keep(&ev("csp_violation", Severity::Medium, &clock)));
    clock.advance(1);
    assert!(sampler.should_keep(&ev("csp_violation", Severity::Medium, &clock)));
}

#[test]
fn multiplier_doubles_and_caps_at_32() {
    let (clock, sampler) = sampler_with(3);
    let cfg = sampler.config().clone();

    assert!(sampler.should_keep(&ev("form_spam", Severity::Medium, &clock)));

    let mut seen = Vec::new();
    for _ in 0..8 {
        let mult = sampler.state("form_spam", Severity::Medium).unwrap().backoff_multiplier;
        clock.advance(cfg.window_ms(mult));
        assert!(sampler.should_keep(&ev("form_spam", Severity::Medium, &clock)));
        let next = sampler.state("form_spam", Severity::Medium).unwrap().backoff_multiplier;
        assert!(next.is_power_of_two());
        seen.push(next);
    }
    assert_eq!(seen, vec![2, 4, 8, 16, 32, 32, 32, 32]);
}

#[test]
fn priority_event_resets_backoff_of_same_event_type() {
    let (clock, sampler) = sampler_with(4);
    let cfg = sampler.config().clone();

    assert!(sampler.should_keep(&ev("login_failed", Severity::Medium, &clock)));
    for _ in 0..3 {
        let mult = sampler.state("login_failed", Severity::Medium).unwrap().backoff_multiplier;
        clock.advance(cfg.window_ms(mult));
        assert!(sampler.should_keep(&ev("login_failed", Severity::Medium, &clock)));
    }
    assert_eq!(
        sampler.state("login_failed", Severity::Medium).unwrap().backoff_multiplier,
        8
    );

    assert!(sampler.should_keep(&ev("login_failed", Severity::Critical, &clock)));
    assert_eq!(
        sampler.state("login_failed", Severity::Medium).unwrap().backoff_multiplier,
        1
    );

    // An 8x window would still suppress this; the reset base window does not.
    clock.advance(MINUTE);
    assert!(sampler.should_keep(&ev("login_failed", Severity::Medium, &clock)));
}

#[test]
fn first_sight_low_and_info_sampled_one_in_ten() {
    let (clock, sampler) = sampler_with(42);
    let trials = 100_000u32;

    for sev in [Severity::Low, Severity::Info] {
        let mut kept = 0u32;
        for i in 0..trials {
            if sampler.should_keep_with_rate(&ev(&format!("fresh{i}"), sev, &clock), 10) {
                kept += 1;
            }
        }
        let rate = f64::from(kept) / f64::from(trials);
        assert!((0.09..=0.11).contains(&rate), "severity={sev} rate={rate}");
    }
}

#[test]
fn medium_is_kept_on_first_sight_regardless_of_rate() {
    let (clock, sampler) = sampler_with(5);
    for i in 0..1_000 {
        let event = ev(&format!("m{i}"), Severity::Medium, &clock);
        assert!(sampler.should_keep_with_rate(&event, 1_000));
    }
}

#[test]
fn zero_and_one_sampling_rates_keep_everything() {
    let (clock, sampler) = sampler_with(6);
    for i in 0..200 {
        assert!(sampler.should_keep_with_rate(&ev(&format!("a{i}"), Severity::Low, &clock), 0));
        assert!(sampler.should_keep_with_rate(&ev(&format!("b{i}"), Severity::Info, &clock), 1));
    }
}

#[test]
fn dropped_first_sight_still_starts_the_window() {
    let (clock, sampler) = sampler_with(7);

    // Find a key whose first sight loses the roll.
    let mut lost = None;
    for i in 0..1_000 {
        let name = format!("noise{i}");
        if sampler.evaluate(&ev(&name, Severity::Info, &clock), 10) == Decision::DropSampled {
            lost = Some(name);
            break;
        }
    }
    let name = lost.expect("one in ten keeps; a drop must occur");

    clock.advance(MINUTE - 1);
    assert_eq!(
        sampler.evaluate(&ev(&name, Severity::Info, &clock), 10),
        Decision::DropSuppressed
    );
    clock.advance(1);
    assert_eq!(
        sampler.evaluate(&ev(&name, Severity::Info, &clock), 10),
        Decision::KeepWindowElapsed
    );
}

#[test]
fn cleanup_purges_only_expired_keys() {
    let (clock, sampler) = sampler_with(8);

    assert!(sampler.should_keep(&ev("stale", Severity::Medium, &clock)));
    clock.set(T0 + 2 * HOUR - MINUTE);
    assert!(sampler.should_keep(&ev("fresh", Severity::Medium, &clock)));

    clock.set(T0 + 2 * HOUR);
    assert_eq!(sampler.cleanup(), 0, "exactly at the threshold survives");

    clock.set(T0 + 2 * HOUR + 1);
    assert_eq!(sampler.cleanup(), 1);
    assert!(sampler.state("stale", Severity::Medium).is_none());
    assert!(sampler.state("fresh", Severity::Medium).is_some());

    // A purged key is a first sight again.
    assert_eq!(
        sampler.evaluate(&ev("stale", Severity::Medium, &clock), 10),
        Decision::KeepFirstSight
    );
}

#[test]
fn critical_kept_twice_low_repeat_dropped() {
    let (clock, sampler) = sampler_with(9);

    assert!(sampler.should_keep(&ev("ping", Severity::Critical, &clock)));
    clock.advance(1);
    assert!(sampler.should_keep(&ev("ping", Severity::Critical, &clock)));

    clock.set(T0);
    assert!(sampler.should_keep_with_rate(&ev("ping", Severity::Low, &clock), 1));
    clock.advance(1_000);
    assert!(!sampler.should_keep(&ev("ping", Severity::Low, &clock)));
}

#[test]
fn concurrent_first_sight_is_kept_once() {
    let clock = Arc::new(ManualClock::new(T0));
    let sampler = Arc::new(Sampler::with_rng(
        SamplerConfig::default(),
        clock.clone(),
        Box::new(StdRng::seed_from_u64(10)),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sampler = Arc::clone(&sampler);
            thread::spawn(move || {
                let event = EventRecord::new("burst", Severity::Medium, T0);
                (0..100).filter(|_| sampler.should_keep(&event)).count()
            })
        })
        .collect();

    let kept: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(kept, 1);
    assert_eq!(
        sampler.state("burst", Severity::Medium).unwrap().occurrence_count,
        800
    );
}

#[test]
fn new_keys_beyond_ceiling_are_dropped_until_cleanup() {
    let clock = Arc::new(ManualClock::new(T0));
    let cfg = SamplerConfig {
        max_tracked_keys: 2,
        ..SamplerConfig::default()
    };
    let sampler = Sampler::with_rng(cfg, clock.clone(), Box::new(StdRng::seed_from_u64(11)));

    assert!(sampler.should_keep(&ev("a", Severity::Medium, &clock)));
    assert!(sampler.should_keep(&ev("b", Severity::Medium, &clock)));
    assert_eq!(
        sampler.evaluate(&ev("c", Severity::Medium, &clock), 10),
        Decision::DropCapacity
    );
    assert_eq!(sampler.tracked_keys(), 2);

    // Tracked keys and priority events are unaffected by the ceiling.
    clock.advance(MINUTE);
    assert_eq!(
        sampler.evaluate(&ev("a", Severity::Medium, &clock), 10),
        Decision::KeepWindowElapsed
    );
    assert!(sampler.should_keep(&ev("c", Severity::Critical, &clock)));

    clock.set(T0 + 2 * HOUR + MINUTE + 1);
    assert_eq!(sampler.cleanup(), 2);
    assert_eq!(
        sampler.evaluate(&ev("c", Severity::Medium, &clock), 10),
        Decision::KeepFirstSight
    );
}
