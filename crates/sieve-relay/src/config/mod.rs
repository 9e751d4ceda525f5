//! Relay config loader (strict parsing).

pub mod schema;

use std::fs;

use sieve_core::error::{Result, SieveError};

pub use schema::{RelayConfig, RelaySection, SinkKind, SinkSection};

/// Environment variable overriding the config path.
pub const CONFIG_PATH_ENV: &str = "SIEVE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "sieve.yaml";

pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub fn load_from_file(path: &str) -> Result<RelayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SieveError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RelayConfig> {
    let cfg: RelayConfig = serde_yaml::from_str(s)
        .map_err(|e| SieveError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
