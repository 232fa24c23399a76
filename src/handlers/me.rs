//! Per-user views: stats, share list, analytics, activity.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::handlers::bearer_token;
use crate::models::{ActivityEvent, AnalyticsResponse, AuthUser, ShareListItem, ShareRow, StatsResponse};
use crate::services::analytics;
use crate::AppState;

const SHARES_TABLE: &str = "shares";

/// All /api/me routes require a resolvable identity. The header check comes
/// first so a missing or malformed header never touches the platform.
async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser> {
    let token = bearer_token(headers).ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid Authorization header".to_string())
    })?;
    let client = state.platform()?;
    client
        .get_user(token)
        .await
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
}

#[derive(Deserialize)]
struct ViewCountRow {
    #[serde(default)]
    view_count: i64,
}

/// GET /api/me/stats
pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>> {
    let user = require_user(&state, &headers).await?;
    let client = state.platform()?;

    let rows = client
        .select(
            SHARES_TABLE,
            &[
                ("select", "view_count".to_string()),
                ("user_id", format!("eq.{}", user.id)),
            ],
        )
        .await
        .map_err(|e| AppError::Platform(format!("Failed to fetch stats: {}", e)))?;

    let counts: Vec<ViewCountRow> = serde_json::from_value(rows).unwrap_or_default();
    let view_counts: Vec<i64> = counts.iter().map(|r| r.view_count).collect();
    Ok(Json(analytics::compute_stats(&view_counts)))
}

/// GET /api/me/shares
pub async fn shares(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    let user = require_user(&state, &headers).await?;
    let client = state.platform()?;

    let rows = client
        .select(
            SHARES_TABLE,
            &[
                (
                    "select",
                    "code,content_type,file_name,file_size,file_url,created_at,view_count"
                        .to_string(),
                ),
                ("user_id", format!("eq.{}", user.id)),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
        .map_err(|e| AppError::Platform(format!("Failed to fetch shares: {}", e)))?;

    let items: Vec<ShareListItem> = serde_json::from_value(rows)
        .map_err(|e| AppError::Platform(format!("Unexpected share row shape: {}", e)))?;
    Ok(Json(json!({ "shares": items })))
}

/// GET /api/me/analytics
pub async fn user_analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AnalyticsResponse>> {
    let user = require_user(&state, &headers).await?;
    let client = state.platform()?;

    let rows = client
        .select(
            SHARES_TABLE,
            &[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user.id)),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
        .map_err(|e| AppError::Platform(format!("Failed to fetch analytics: {}", e)))?;

    let shares: Vec<ShareRow> = serde_json::from_value(rows)
        .map_err(|e| AppError::Platform(format!("Unexpected share row shape: {}", e)))?;
    Ok(Json(analytics::compute_analytics(&shares, Utc::now())))
}

/// GET /api/me/activity
pub async fn activity(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    let user = require_user(&state, &headers).await?;
    let client = state.platform()?;

    // The feed derives at most two events per share, so the 20 newest rows
    // are enough to fill it.
    let rows = client
        .select(
            SHARES_TABLE,
            &[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user.id)),
                ("order", "created_at.desc".to_string()),
                ("limit", analytics::ACTIVITY_LIMIT.to_string()),
            ],
        )
        .await
        .map_err(|e| AppError::Platform(format!("Failed to fetch activity: {}", e)))?;

    let shares: Vec<ShareRow> = serde_json::from_value(rows)
        .map_err(|e| AppError::Platform(format!("Unexpected share row shape: {}", e)))?;
    let events: Vec<ActivityEvent> = analytics::build_activity(&shares);
    Ok(Json(json!({ "activities": events })))
}
