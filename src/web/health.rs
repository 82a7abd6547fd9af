use crate::db;
use crate::state::SharedState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

pub fn router(state: SharedState) -> Router {
    Router::new().route("/", get(health)).with_state(state)
}

async fn health(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    let time_utc = Utc::now().to_rfc3339();
    match db::ping(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "time_utc": time_utc, "db": "ok" })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "time_utc": time_utc,
                    "db": "error",
                    "db_error": e.to_string(),
                })),
            )
        }
    }
}
