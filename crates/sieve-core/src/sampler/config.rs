use serde::Deserialize;

use crate::error::{Result, SieveError};
use crate::event::Severity;

/// Sampler tuning. Defaults are the production constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerConfig {
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_max_multiplier")]
    pub max_multiplier: u32,

    #[serde(default = "default_sampling_rate")]
    pub default_sampling_rate: u32,

    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,

    /// Ceiling on tracked keys. New non-priority keys beyond it are dropped
    /// until `cleanup` frees space.
    #[serde(default = "default_max_tracked_keys")]
    pub max_tracked_keys: usize,

    /// Severities sampled 1-in-N on first sight. Anything else not
    /// high/critical/error is kept on first sight.
    #[serde(default = "default_sampled_severities")]
    pub sampled_severities: Vec<Severity>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_multiplier: default_max_multiplier(),
            default_sampling_rate: default_sampling_rate(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
            max_tracked_keys: default_max_tracked_keys(),
            sampled_severities: default_sampled_severities(),
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_backoff_ms == 0 {
            return Err(SieveError::BadRequest(
                "sampler.base_backoff_ms must be greater than 0".into(),
            ));
        }
        if self.max_backoff_ms < self.base_backoff_ms {
            return Err(SieveError::BadRequest(
                "sampler.max_backoff_ms must be >= base_backoff_ms".into(),
            ));
        }
        if !self.max_multiplier.is_power_of_two() || self.max_multiplier > 1024 {
            return Err(SieveError::BadRequest(
                "sampler.max_multiplier must be a power of two between 1 and 1024".into(),
            ));
        }
        if self.default_sampling_rate == 0 {
            return Err(SieveError::BadRequest(
                "sampler.default_sampling_rate must be at least 1".into(),
            ));
        }
        if self.cleanup_interval_ms < 1000 {
            return Err(SieveError::BadRequest(
                "sampler.cleanup_interval_ms must be at least 1000".into(),
            ));
        }
        if self.max_tracked_keys == 0 {
            return Err(SieveError::BadRequest(
                "sampler.max_tracked_keys must be at least 1".into(),
            ));
        }
        if let Some(sev) = self.sampled_severities.iter().find(|s| s.is_priority()) {
            return Err(SieveError::BadRequest(format!(
                "sampler.sampled_severities must not contain {sev} (always kept)"
            )));
        }
        Ok(())
    }

    /// Suppression window for a given multiplier.
    pub fn window_ms(&self, multiplier: u32) -> u64 {
        self.base_backoff_ms
            .saturating_mul(u64::from(multiplier))
            .min(self.max_backoff_ms)
    }

    /// Idle time after which a key is purged.
    pub fn expiry_ms(&self) -> u64 {
        self.max_backoff_ms.saturating_mul(2)
    }

    pub fn is_sampled(&self, severity: Severity) -> bool {
        self.sampled_severities.contains(&severity)
    }
}

fn default_base_backoff_ms() -> u64 {
    60_000
}
fn default_max_backoff_ms() -> u64 {
    3_600_000
}
fn default_max_multiplier() -> u32 {
    32
}
fn default_sampling_rate() -> u32 {
    10
}
fn default_cleanup_interval_ms() -> u64 {
    300_000
}
fn default_max_tracked_keys() -> usize {
    100_000
}
fn default_sampled_severities() -> Vec<Severity> {
    vec![Severity::Info, Severity::Low]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = SamplerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.expiry_ms(), 7_200_000);
        assert_eq!(cfg.window_ms(1), 60_000);
        assert_eq!(cfg.window_ms(32), 1_920_000);
        assert_eq!(cfg.window_ms(128), 3_600_000);
    }

    #[test]
    fn rejects_non_power_of_two_multiplier() {
        let cfg = SamplerConfig {
            max_multiplier: 24,
            ..SamplerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_key_ceiling() {
        assert_eq!(SamplerConfig::default().max_tracked_keys, 100_000);
        let cfg = SamplerConfig {
            max_tracked_keys: 0,
            ..SamplerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_sampling_priority_severity() {
        let cfg = SamplerConfig {
            sampled_severities: vec![Severity::Low, Severity::Critical],
            ..SamplerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
