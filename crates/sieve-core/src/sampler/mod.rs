//! Rate-limited event sampler.
//!
//! Decides per event whether it is forwarded or dropped, based on severity,
//! a 1-in-N first-sight sample for low-priority events, and an exponential
//! backoff window per `eventType_severity` key. State is bounded by
//! [`Sampler::cleanup`], which the host calls on its own ticker.

pub mod config;
pub mod engine;

pub use config::SamplerConfig;
pub use engine::{Decision, Sampler, SamplingState};
