//! File delivery proxy: serves share bytes without exposing storage directly.

use std::time::Duration;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::services::share::parse_proxy_marker;
use crate::supabase::SupabaseClient;
use crate::AppState;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const PROXY_SIGNED_URL_TTL_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    pub url: Option<String>,
}

/// GET /api/files/fetch?url=...
///
/// Accepts either a platform-issued absolute URL or an internal
/// `proxy:<bucket>/<path>` marker. Absolute URLs must point at the configured
/// platform host so this endpoint cannot be used as an open relay.
pub async fn fetch_file(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Response> {
    let url = query
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing url".to_string()))?;

    let client = state.platform()?;

    if let Some((bucket, path)) = parse_proxy_marker(&url) {
        return proxy_private_object(client, bucket, path).await;
    }

    let allowed_host = client
        .host()
        .ok_or_else(|| AppError::Config("Platform URL has no host".to_string()))?;
    let parsed = reqwest::Url::parse(&url)
        .map_err(|_| AppError::BadRequest("Invalid file host".to_string()))?;
    if url_netloc(&parsed).as_deref() != Some(allowed_host.as_str()) {
        return Err(AppError::BadRequest("Invalid file host".to_string()));
    }

    fetch_url(state.http.clone(), &url)
        .await
        .map_err(|e| AppError::BadGateway(format!("Fetch failed: {}", e)))
}

/// Serve an object that never got an externally resolvable URL: mint a fresh
/// signed URL, and fall back to a privileged direct download.
async fn proxy_private_object(
    client: &SupabaseClient,
    bucket: &str,
    path: &str,
) -> Result<Response> {
    match client
        .create_signed_url(bucket, path, PROXY_SIGNED_URL_TTL_SECS)
        .await
    {
        Ok(signed) => match fetch_url(client.http().clone(), &signed).await {
            Ok(response) => return Ok(response),
            Err(e) => tracing::warn!("Failed to access file via signed URL: {}", e),
        },
        Err(e) => tracing::warn!("Failed to create signed URL for {}/{}: {}", bucket, path, e),
    }

    match client.download_object(bucket, path).await {
        Ok((data, content_type)) => build_file_response(
            data,
            content_type.as_deref().unwrap_or("application/octet-stream"),
            None,
        ),
        Err(e) => Err(AppError::BadGateway(format!("File access failed: {}", e))),
    }
}

/// Fetch a URL with the bounded timeout and re-emit its bytes, preserving
/// content type and disposition.
async fn fetch_url(http: reqwest::Client, url: &str) -> std::result::Result<Response, String> {
    let response = http
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| crate::supabase::response::describe_transport_error(&e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("Upstream returned status {}", status));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let data = response.bytes().await.map_err(|e| e.to_string())?;
    build_file_response(data, &content_type, disposition.as_deref()).map_err(|e| e.to_string())
}

fn build_file_response(
    data: Bytes,
    content_type: &str,
    disposition: Option<&str>,
) -> Result<Response> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, data.len());
    if let Some(cd) = disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, cd);
    }
    builder
        .body(Body::from(data))
        .map_err(|e| AppError::Platform(format!("Failed to build response: {}", e)))
}

/// Host plus explicit port, the way URL authorities compare.
fn url_netloc(url: &reqwest::Url) -> Option<String> {
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host.to_string()),
    }
}
