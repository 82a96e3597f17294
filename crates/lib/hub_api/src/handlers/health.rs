//! Health and readiness endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;

use crate::AppState;
use crate::models::{HealthResponse, ReadinessChecks, ReadyResponse};

/// `GET /health/`: database probe; 503 when the database is unreachable.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = hub_core::db::check_health(&state.pool).await;
    let (status, label) = if database.connected {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };
    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            database,
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}

/// `GET /ready/`: startup check results; 503 until every check passed.
pub async fn ready_handler(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let readiness = state.readiness;
    let status = if readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadyResponse {
            ready: readiness.is_ready(),
            checks: ReadinessChecks {
                migrations: readiness.migrations,
                model: readiness.model,
            },
        }),
    )
}
