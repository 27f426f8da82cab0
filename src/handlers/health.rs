use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::dto::HealthResponse;
use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_ok = state.vibes.ping().await.is_ok();

    let response = HealthResponse {
        server_status: "OK".into(),
        database_status: if db_ok { "OK".into() } else { "UNAVAILABLE".into() },
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: Utc::now(),
    };

    let status = if db_ok {
        StatusCode::OK
    } else {
        tracing::warn!("Health check: database ping failed");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.vibes.ping().await.is_ok() {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": { "database": "ok" },
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": { "database": "failed" },
            })),
        )
    }
}
