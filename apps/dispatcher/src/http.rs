//! Minimal health/metrics listener: `/ready`, `/live`, `/metrics`.
//!
//! The control surface described alongside this service (`/start`, `/stop`,
//! `/sent-messages`) is out of scope here; it is expected to sit in front of
//! this crate as a separate process consuming the command bus and
//! `StoreGateway::list_sent` directly.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use domain_dispatch::ReadinessProbe;
use observability::metrics_handler;

#[derive(Clone)]
struct HealthState {
    readiness: Arc<ReadinessProbe>,
}

pub fn router(readiness: Arc<ReadinessProbe>) -> Router {
    let state = HealthState { readiness };

    Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn ready(State(state): State<HealthState>) -> StatusCode {
    if state.readiness.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn live() -> StatusCode {
    StatusCode::OK
}
