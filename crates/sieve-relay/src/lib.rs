//! sieve relay library entry.
//!
//! This crate wires configuration, the sampler, the security logger, the
//! sink flusher, and the janitor into an HTTP relay. It is intended to be
//! consumed by the binary (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod config;
pub mod ingest;
pub mod janitor;
pub mod logger;
pub mod obs;
pub mod ops;
pub mod router;
pub mod sink;
