//! Thin proxies over the platform auth service. No credentials or sessions
//! are stored locally.

use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::handlers::bearer_token;
use crate::models::CredentialsRequest;
use crate::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<Value>> {
    let (email, password) = require_credentials(&body)?;
    let client = state.platform()?;

    let session = client.sign_in(email, password).await?;
    if session.access_token.is_none() {
        return Err(AppError::Unauthorized("Login failed".to_string()));
    }

    Ok(Json(json!({
        "access_token": session.access_token,
        "refresh_token": session.refresh_token,
        "user": session.user,
    })))
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<Value>> {
    let (email, password) = require_credentials(&body)?;
    let client = state.platform()?;

    let session = client.sign_up(email, password).await?;
    if session.user.is_none() {
        return Err(AppError::BadRequest("Signup failed".to_string()));
    }

    let message = if session.access_token.is_some() {
        "Signup successful"
    } else {
        // Email confirmation enabled on the platform
        "Signup successful. Please check your email for confirmation."
    };

    Ok(Json(json!({
        "access_token": session.access_token,
        "refresh_token": session.refresh_token,
        "user": session.user,
        "message": message,
    })))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>> {
    if let Some(token) = bearer_token(&headers) {
        let client = state.platform()?;
        if let Err(e) = client.sign_out(token).await {
            tracing::warn!("Logout call failed: {}", e);
        }
    }
    Ok(Json(json!({ "message": "Logged out" })))
}

/// GET /api/auth/user
pub async fn current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;
    let client = state.platform()?;

    let user = client.get_user(token).await?;
    Ok(Json(json!({ "user": user })))
}

fn require_credentials(body: &CredentialsRequest) -> Result<(&str, &str)> {
    match (body.email.as_deref(), body.password.as_deref()) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            Ok((email, password))
        }
        _ => Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        )),
    }
}
