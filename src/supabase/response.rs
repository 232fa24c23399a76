use serde_json::Value;

/// Error surfaced by any platform call, normalized at the response boundary.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct PlatformError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl PlatformError {
    pub fn transport(err: &reqwest::Error) -> Self {
        Self {
            status: None,
            code: None,
            message: describe_transport_error(err),
        }
    }

    /// Insert rejected by a row-level-security policy.
    pub fn is_rls_violation(&self) -> bool {
        let msg = self.message.to_lowercase();
        self.code.as_deref() == Some("42501")
            || msg.contains("row-level security")
            || msg.contains("row level security")
            || msg.contains("42501")
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401) || self.message.to_lowercase().contains("unauthorized")
    }
}

/// Convert a platform HTTP response into `(json, error)` exactly once.
///
/// PostgREST and the storage API both return JSON error bodies with a
/// `message` (sometimes `error` or `msg`) field and often a Postgres `code`.
pub async fn read_json(response: reqwest::Response) -> Result<Value, PlatformError> {
    let status = response.status();
    if status.is_success() {
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let body = response.bytes().await.map_err(|e| PlatformError::transport(&e))?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_slice(&body).map_err(|e| PlatformError {
            status: Some(status.as_u16()),
            code: None,
            message: format!("Invalid JSON from platform: {}", e),
        });
    }

    let text = response.text().await.unwrap_or_default();
    Err(parse_error_body(status.as_u16(), &text))
}

fn parse_error_body(status: u16, body: &str) -> PlatformError {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let message = value
            .get("message")
            .or_else(|| value.get("error"))
            .or_else(|| value.get("msg"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let code = value
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(message) = message {
            return PlatformError {
                status: Some(status),
                code,
                message,
            };
        }
    }
    PlatformError {
        status: Some(status),
        code: None,
        message: if body.is_empty() {
            format!("Platform request failed with status {}", status)
        } else {
            body.to_string()
        },
    }
}

/// Render a reqwest error, calling out DNS resolution failures distinctly.
pub fn describe_transport_error(err: &reqwest::Error) -> String {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            let host = err
                .url()
                .and_then(|u| u.host_str())
                .unwrap_or("<unknown>");
            return format!("DNS resolution failed for host '{}': {}", host, text);
        }
        source = cause.source();
    }
    if err.is_timeout() {
        return format!("Request timed out: {}", err);
    }
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_postgrest_error_body() {
        let err = parse_error_body(
            403,
            r#"{"code":"42501","message":"new row violates row-level security policy"}"#,
        );
        assert_eq!(err.status, Some(403));
        assert_eq!(err.code.as_deref(), Some("42501"));
        assert!(err.is_rls_violation());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_parse_storage_error_body() {
        let err = parse_error_body(401, r#"{"error":"Unauthorized","msg":"invalid apikey"}"#);
        assert_eq!(err.message, "Unauthorized");
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_non_json_error_body_falls_back_to_text() {
        let err = parse_error_body(502, "upstream unavailable");
        assert_eq!(err.message, "upstream unavailable");
        assert_eq!(err.status, Some(502));
    }

    #[test]
    fn test_empty_error_body_reports_status() {
        let err = parse_error_body(500, "");
        assert!(err.message.contains("500"));
    }

    #[test]
    fn test_rls_detected_from_message_text() {
        let err = PlatformError {
            status: Some(500),
            code: None,
            message: "insert blocked: row level security".to_string(),
        };
        assert!(err.is_rls_violation());
    }
}
