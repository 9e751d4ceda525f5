use serde::Deserialize;
use sieve_core::error::{Result, SieveError};
use sieve_core::SamplerConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    pub version: u32,

    #[serde(default)]
    pub relay: RelaySection,

    #[serde(default)]
    pub sampler: SamplerConfig,

    #[serde(default)]
    pub sink: SinkSection,
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SieveError::UnsupportedVersion);
        }

        self.relay.validate()?;
        self.sampler.validate()?;
        self.sink.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Upper bound on events per ingest request.
    #[serde(default = "default_max_batch_events")]
    pub max_batch_events: usize,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_batch_events: default_max_batch_events(),
        }
    }
}

impl RelaySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=10_000).contains(&self.max_batch_events) {
            return Err(SieveError::BadRequest(
                "relay.max_batch_events must be between 1 and 10000".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Stdout,
    Http,
    Null,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkSection {
    #[serde(default = "default_sink_kind")]
    pub kind: SinkKind,

    /// Endpoint for `kind: http`.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Events per flushed batch.
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Kept events buffered between logger and flusher.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            kind: default_sink_kind(),
            url: None,
            timeout_ms: default_timeout_ms(),
            max_batch: default_max_batch(),
            flush_interval_ms: default_flush_interval_ms(),
            buffer: default_buffer(),
        }
    }
}

impl SinkSection {
    pub fn validate(&self) -> Result<()> {
        if self.kind == SinkKind::Http {
            match self.url.as_deref() {
                Some(u) if u.starts_with("http://") || u.starts_with("https://") => {}
                _ => {
                    return Err(SieveError::BadRequest(
                        "sink.url must be an http(s) URL when sink.kind is http".into(),
                    ))
                }
            }
        }
        if !(100..=60_000).contains(&self.timeout_ms) {
            return Err(SieveError::BadRequest(
                "sink.timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.max_batch == 0 {
            return Err(SieveError::BadRequest("sink.max_batch must be at least 1".into()));
        }
        if !(10..=600_000).contains(&self.flush_interval_ms) {
            return Err(SieveError::BadRequest(
                "sink.flush_interval_ms must be between 10 and 600000".into(),
            ));
        }
        if self.buffer < self.max_batch {
            return Err(SieveError::BadRequest(
                "sink.buffer must be >= sink.max_batch".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_max_batch_events() -> usize {
    256
}
fn default_sink_kind() -> SinkKind {
    SinkKind::Stdout
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_max_batch() -> usize {
    100
}
fn default_flush_interval_ms() -> u64 {
    5000
}
fn default_buffer() -> usize {
    1024
}
