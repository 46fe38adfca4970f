use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::response::AppError;
use crate::state::AppState;

const PROBE_KEY: &str = "__health_check__";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/database", get(database_health))
        .route("/metrics", get(metrics))
}

pub async fn health_check(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let healthy = state.store().get_learner_stats(PROBE_KEY).is_ok();
    Json(serde_json::json!({
        "status": if healthy { "ok" } else { "degraded" },
        "uptimeSecs": state.uptime_secs(),
        "store": {
            "healthy": healthy,
        }
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

pub async fn readiness(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    match state.store().get_learner_stats(PROBE_KEY) {
        Ok(_) => Ok(StatusCode::OK),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            Err(AppError::service_unavailable("存储不可用"))
        }
    }
}

pub async fn database_health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let start = Instant::now();
    let healthy = state.store().get_learner_stats(PROBE_KEY).is_ok();
    let latency_us = start.elapsed().as_micros() as u64;

    Json(serde_json::json!({
        "healthy": healthy,
        "latencyUs": latency_us,
        "sizeOnDisk": state.store().raw_db().size_on_disk().ok(),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let snapshot = state.engine().metrics().snapshot();
    Json(serde_json::json!({
        "strategies": snapshot,
    }))
}
