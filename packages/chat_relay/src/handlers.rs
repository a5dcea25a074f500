use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::error::RelayError;
use crate::hub::UserSnapshot;
use crate::metrics;

/// Current user list as the hub sees it
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserSnapshot>, RelayError> {
    Ok(Json(state.hub.users().await?))
}

/// Health check endpoint - returns relay status
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let metrics = state.metrics.snapshot();

    let registered = match state.hub.users().await {
        Ok(snapshot) => snapshot.connections as u64,
        Err(_) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(metrics::HealthStatus {
                    status: "unavailable".to_string(),
                    registered: 0,
                    connections: metrics.connections.active,
                    uptime_secs: metrics.uptime_secs,
                }),
            )
                .into_response();
        }
    };

    let status = if metrics.errors.reader_panics == 0 {
        "healthy"
    } else {
        "degraded"
    };

    Json(metrics::HealthStatus {
        status: status.to_string(),
        registered,
        connections: metrics.connections.active,
        uptime_secs: metrics.uptime_secs,
    })
    .into_response()
}

/// Metrics endpoint - returns detailed relay metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Liveness probe - returns 200 if the server is running
pub async fn health_live_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "alive" }))
}
