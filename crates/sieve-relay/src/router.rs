//! Axum router wiring.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ingest, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", post(ingest::ingest))
        .route("/v1/stats", get(ingest::stats))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
