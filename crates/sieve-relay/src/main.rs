//! sieve relay
//!
//! - POST /v1/events: sample and forward security telemetry
//! - Janitor purges idle sampler state on a fixed interval
//! - Ctrl-C drains: readiness flips, in-flight requests finish, buffered
//!   events are flushed, then exit

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use sieve_core::error::{Result, SieveError};
use sieve_relay::{app_state, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "sieve-relay failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = config::config_path();
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.relay.listen.parse().map_err(|e| {
        SieveError::BadRequest(format!("relay.listen must be a valid SocketAddr: {e}"))
    })?;

    let (state, background) = app_state::AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "sieve-relay starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| SieveError::Internal(format!("bind {listen} failed: {e}")))?;

    let drain_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "ctrl_c handler failed");
            }
            drain_state.set_draining();
        })
        .await
        .map_err(|e| SieveError::Internal(format!("server failed: {e}")))?;

    // In-flight requests are done; only now stop the background tasks.
    state.shutdown(background).await;
    tracing::info!("sieve-relay stopped");
    Ok(())
}
