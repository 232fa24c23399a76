//! GoTrue auth surface: user resolution, sessions, and the health probe.

use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::models::{AuthHealth, AuthSession, AuthUser};
use crate::supabase::client::{SupabaseClient, APIKEY_HEADER};
use crate::supabase::response::{self, PlatformError};

/// Default timeout for the auth health probe.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

impl SupabaseClient {
    /// Resolve a user's bearer token to an identity.
    pub async fn get_user(&self, token: &str) -> Result<AuthUser> {
        let response = self
            .http()
            .get(self.endpoint("/auth/v1/user"))
            .headers(self.user_headers(token))
            .send()
            .await
            .map_err(|e| AppError::Unauthorized(response::describe_transport_error(&e)))?;

        if !response.status().is_success() {
            return Err(AppError::Unauthorized("Invalid token".to_string()));
        }

        response
            .json::<AuthUser>()
            .await
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .http()
            .post(self.endpoint("/auth/v1/token?grant_type=password"))
            .headers(self.platform_headers())
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::Unauthorized(response::describe_transport_error(&e)))?;

        if !response.status().is_success() {
            return Err(AppError::Unauthorized("Login failed".to_string()));
        }

        parse_session(response).await
    }

    /// Register a new account. The session may be absent when email
    /// confirmation is enabled on the platform.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .http()
            .post(self.endpoint("/auth/v1/signup"))
            .headers(self.platform_headers())
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::BadRequest(response::describe_transport_error(&e)))?;

        if !response.status().is_success() {
            let err = response::read_json(response).await.err().unwrap_or(PlatformError {
                status: None,
                code: None,
                message: "Signup failed".to_string(),
            });
            return Err(AppError::BadRequest(err.message));
        }

        parse_session(response).await
    }

    /// Invalidate a session. Failures are ignored by callers.
    pub async fn sign_out(&self, token: &str) -> Result<()> {
        self.http()
            .post(self.endpoint("/auth/v1/logout"))
            .headers(self.user_headers(token))
            .send()
            .await
            .map_err(|e| AppError::Platform(response::describe_transport_error(&e)))?;
        Ok(())
    }
}

async fn parse_session(response: reqwest::Response) -> Result<AuthSession> {
    let value: Value = response
        .json()
        .await
        .map_err(|e| AppError::Platform(format!("Invalid auth response: {}", e)))?;

    // Signup responses put the user at the top level when no session exists
    let session = if value.get("access_token").is_some() {
        serde_json::from_value(value).ok()
    } else if value.get("id").is_some() {
        serde_json::from_value::<AuthUser>(value).ok().map(|user| AuthSession {
            access_token: None,
            refresh_token: None,
            user: Some(user),
        })
    } else {
        serde_json::from_value(value).ok()
    };

    session.ok_or_else(|| AppError::Platform("Unrecognized auth response shape".to_string()))
}

/// Probe the auth health endpoint, measuring latency regardless of outcome.
///
/// Runs off the shared client so it still works when the platform key is
/// missing and no client could be built.
pub async fn auth_health(
    http: &reqwest::Client,
    url: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AuthHealth {
    let Some(url) = url else {
        return AuthHealth {
            ok: false,
            status: None,
            latency_ms: None,
            error: Some("SUPABASE_URL not set".to_string()),
            host: None,
        };
    };

    let base = url.trim_end_matches('/');
    let health_url = format!("{}/auth/v1/health", base);
    let host = reqwest::Url::parse(base)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));

    let mut request = http.get(&health_url).timeout(timeout);
    // Hosted platforms gate even the health endpoint behind the apikey
    if let Some(key) = api_key {
        request = request
            .header(APIKEY_HEADER, key)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", key));
    }

    let start = Instant::now();
    let outcome = request.send().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(response) => {
            let status = response.status().as_u16();
            AuthHealth {
                ok: response.status().is_success(),
                status: Some(status),
                latency_ms: Some(latency_ms),
                error: if response.status().is_success() {
                    None
                } else {
                    Some(format!("Health endpoint returned status {}", status))
                },
                host,
            }
        }
        Err(e) => AuthHealth {
            ok: false,
            status: e.status().map(|s| s.as_u16()),
            latency_ms: Some(latency_ms),
            error: Some(response::describe_transport_error(&e)),
            host,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_without_url_reports_error() {
        let http = reqwest::Client::new();
        let health = auth_health(&http, None, None, HEALTH_TIMEOUT).await;
        assert!(!health.ok);
        assert_eq!(health.error.as_deref(), Some("SUPABASE_URL not set"));
        assert!(health.latency_ms.is_none());
    }

    #[tokio::test]
    async fn test_health_failure_still_measures_latency() {
        let http = reqwest::Client::new();
        // Unroutable per RFC 5737; connect fails fast against the short timeout
        let health = auth_health(
            &http,
            Some("http://192.0.2.1:9"),
            Some("key"),
            Duration::from_millis(200),
        )
        .await;
        assert!(!health.ok);
        assert!(health.latency_ms.is_some());
        assert!(health.error.is_some());
        assert_eq!(health.host.as_deref(), Some("192.0.2.1"));
    }
}
