use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::models::ConnectionReport;
use crate::services::diagnostics;
use crate::AppState;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello" }))
}

/// GET /ping
pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// GET /supabase/health — always 200; degradation lives in the report body.
pub async fn supabase_health(State(state): State<AppState>) -> Json<ConnectionReport> {
    let report = diagnostics::connection_report(
        &state.config,
        state.supabase.as_deref(),
        state.supabase_error.as_deref(),
        &state.http,
    )
    .await;
    Json(report)
}
