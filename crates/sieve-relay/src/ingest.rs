//! Event ingestion and stats endpoints.
//!
//! - `POST /v1/events` : `{"events": [...]}` -> `{"received", "kept", "dropped"}`
//! - `GET  /v1/stats`  : sampler/decision totals

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use sieve_core::error::{ClientCode, Result, SieveError};
use sieve_core::EventRecord;

use crate::app_state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestRequest {
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub received: usize,
    pub kept: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBody {
    pub tracked_keys: usize,
    pub kept: u64,
    pub dropped: u64,
}

/// Run a batch through the logger. Rejects the whole batch when draining
/// or when it exceeds `relay.max_batch_events`.
pub fn ingest_batch(state: &AppState, req: IngestRequest) -> Result<IngestSummary> {
    if state.is_draining() {
        return Err(SieveError::Unavailable);
    }
    if req.events.len() > state.cfg().relay.max_batch_events {
        return Err(SieveError::PayloadTooLarge);
    }

    let mut summary = IngestSummary {
        received: req.events.len(),
        ..IngestSummary::default()
    };
    for ev in req.events {
        state
            .metrics()
            .events_received
            .inc(&[("severity", ev.severity.as_str())]);
        if state.logger().log(ev).is_keep() {
            summary.kept += 1;
        } else {
            summary.dropped += 1;
        }
    }
    Ok(summary)
}

pub fn stats_snapshot(state: &AppState) -> StatsBody {
    let (kept, dropped) = state.metrics().decision_totals();
    StatsBody {
        tracked_keys: state.sampler().tracked_keys(),
        kept,
        dropped,
    }
}

pub async fn ingest(State(state): State<AppState>, Json(req): Json<IngestRequest>) -> Response {
    match ingest_batch(&state, req) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsBody> {
    Json(stats_snapshot(&state))
}

fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest | ClientCode::UnsupportedVersion => StatusCode::BAD_REQUEST,
        ClientCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ClientCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: &SieveError) -> Response {
    let code = err.client_code();
    let body = serde_json::json!({ "error": code.as_str(), "message": err.to_string() });
    (status_for(code), Json(body)).into_response()
}
