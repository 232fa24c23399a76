use axum::{
    extract::{Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json, RequestExt,
};

use crate::error::{AppError, Result};
use crate::handlers::bearer_token;
use crate::models::{CreateShareRequest, ShareInput, UploadedFile};
use crate::services::share as share_service;
use crate::AppState;

/// Create a new share
/// POST /api/shares (multipart/form-data or JSON)
pub async fn create_share(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse> {
    let client = state.platform()?;

    // Identity is optional here: an unresolvable token degrades to anonymous
    let mut user_id = None;
    if let Some(token) = bearer_token(request.headers()) {
        match client.get_user(token).await {
            Ok(user) => user_id = Some(user.id),
            Err(e) => tracing::warn!("Failed to resolve user from token: {}", e),
        }
    }

    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let mut input = if is_multipart {
        let multipart = request
            .extract::<Multipart, _>()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to process multipart: {}", e)))?;
        read_multipart(multipart).await?
    } else {
        read_json_body(request).await
    };
    input.user_id = user_id;

    let response = share_service::create_share(client, &state.config.upload, input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn read_multipart(mut multipart: Multipart) -> Result<ShareInput> {
    let mut input = ShareInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to process multipart: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "code" => {
                let text = field.text().await.unwrap_or_default();
                if !text.is_empty() {
                    input.code = Some(text);
                }
            }
            "text" => {
                input.text = Some(field.text().await.unwrap_or_default());
            }
            "file" => {
                let name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;
                input.file = Some(UploadedFile {
                    name,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    Ok(input)
}

/// JSON bodies are read leniently: an absent or malformed body means an
/// empty submission, matching the multipart form's optional fields.
async fn read_json_body(request: Request) -> ShareInput {
    let body = match axum::body::to_bytes(request.into_body(), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return ShareInput::default(),
    };
    let parsed: CreateShareRequest = serde_json::from_slice(&body).unwrap_or_default();
    ShareInput {
        code: parsed.code,
        text: parsed.text,
        file: None,
        user_id: None,
    }
}

/// Resolve a share by code
/// GET /api/shares/:code
pub async fn get_share(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let client = state.platform()?;
    let row = share_service::resolve_share(client, &code).await?;
    Ok(Json(row))
}
