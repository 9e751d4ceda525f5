//! Top-level facade crate for sieve.
//!
//! Re-exports the sampler core and the relay library so users can depend on a single crate.

pub mod core {
    pub use sieve_core::*;
}

pub mod relay {
    pub use sieve_relay::*;
}
