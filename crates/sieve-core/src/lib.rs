//! sieve core: event model, clock, sanitization, and the rate-limited sampler.
//!
//! This crate holds the decision logic shared by the relay and by any
//! embedding application. It intentionally carries no async runtime or
//! transport dependencies; timers and I/O belong to the host.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Fallible paths surface as `SieveError`/`Result`; the sampler itself is
//! infallible.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod clock;
pub mod error;
pub mod event;
pub mod sampler;
pub mod sanitize;

/// Shared result type.
pub use error::{Result, SieveError};
pub use event::{EventRecord, Severity};
pub use sampler::{Decision, Sampler, SamplerConfig, SamplingState};
