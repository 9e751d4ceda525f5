use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sieve_core::error::{Result, SieveError};
use sieve_core::EventRecord;

use crate::config::SinkSection;

use super::TelemetrySink;

#[derive(Serialize)]
struct Batch<'a> {
    events: &'a [EventRecord],
}

/// POSTs `{"events": [...]}` to a remote collector.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SieveError::Internal(format!("http sink client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(cfg: &SinkSection) -> Result<Self> {
        let url = cfg
            .url
            .clone()
            .ok_or_else(|| SieveError::BadRequest("sink.url is required for http sink".into()))?;
        Self::new(url, Duration::from_millis(cfg.timeout_ms))
    }
}

#[async_trait]
impl TelemetrySink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, events: &[EventRecord]) -> Result<()> {
        self.client
            .post(&self.url)
            .json(&Batch { events })
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| SieveError::Sink(e.to_string()))?;
        Ok(())
    }
}
