//! Telemetry event model.
//!
//! Events arrive as JSON from the site (`{"eventType", "severity",
//! "timestamp", "details"}`) and leave in the same shape toward the sink.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SieveError;

/// Qualitative importance of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
        Severity::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Error => "error",
        }
    }

    /// High, critical and error events bypass sampling and backoff.
    pub fn is_priority(self) -> bool {
        matches!(self, Severity::High | Severity::Critical | Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| SieveError::BadRequest(format!("unknown severity: {s}")))
    }
}

/// One telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_type: String,
    pub severity: Severity,
    /// Milliseconds since the Unix epoch, as reported by the emitter.
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl EventRecord {
    pub fn new(event_type: impl Into<String>, severity: Severity, timestamp: u64) -> Self {
        Self {
            event_type: event_type.into(),
            severity,
            timestamp,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Key under which sampling state is tracked.
    pub fn sampling_key(&self) -> String {
        sampling_key(&self.event_type, self.severity)
    }
}

pub fn sampling_key(event_type: &str, severity: Severity) -> String {
    format!("{event_type}_{severity}")
}
