use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;

use crate::config::SupabaseConfig;
use crate::error::{AppError, Result};

pub const APIKEY_HEADER: &str = "apikey";

/// Privilege class of the configured API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Service-role key: bypasses row-level security, can list buckets and
    /// download from private buckets.
    Service,
    /// Anon key: restricted to whatever row-level security allows.
    Anon,
    /// A key supplied through the generic variable; privilege unknown.
    Unknown,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Service => "service",
            KeyType::Anon => "anon",
            KeyType::Unknown => "unknown",
        }
    }
}

/// Handle to the data platform, built once at startup and shared read-only.
///
/// The key here is platform-scoped; per-request user identity is resolved
/// separately through `get_user` and never baked into this client.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    base_url: String,
    api_key: String,
    key_type: KeyType,
    http: reqwest::Client,
}

impl SupabaseClient {
    /// Build a client from configuration, preferring the most privileged key.
    pub fn from_config(config: &SupabaseConfig) -> Result<Self> {
        let url = config.url.as_deref().ok_or_else(|| {
            AppError::Config("Missing SUPABASE_URL".to_string())
        })?;
        let key = config.effective_key().ok_or_else(|| {
            AppError::Config(
                "Missing Supabase key (SUPABASE_SERVICE_ROLE_KEY/SUPABASE_KEY/SUPABASE_ANON_KEY)"
                    .to_string(),
            )
        })?;

        // Reject URLs reqwest cannot address before any request is made
        Url::parse(url)
            .map_err(|e| AppError::Config(format!("Invalid SUPABASE_URL '{}': {}", url, e)))?;

        let key_type = if config.service_key.is_some() {
            KeyType::Service
        } else if config.generic_key.is_some() {
            KeyType::Unknown
        } else {
            KeyType::Anon
        };

        let http = reqwest::Client::builder()
            .user_agent("codedrop/platform-client")
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            api_key: key.to_string(),
            key_type,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host component of the platform URL, used by the proxy allow-list.
    pub fn host(&self) -> Option<String> {
        let url = Url::parse(&self.base_url).ok()?;
        let host = url.host_str()?.to_string();
        match url.port() {
            Some(port) => Some(format!("{}:{}", host, port)),
            None => Some(host),
        }
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn is_privileged(&self) -> bool {
        self.key_type == KeyType::Service
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Headers authenticating as the platform-scoped key.
    pub(crate) fn platform_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert(HeaderName::from_static(APIKEY_HEADER), value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// Headers authenticating as an end user's bearer token.
    pub(crate) fn user_headers(&self, token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert(HeaderName::from_static(APIKEY_HEADER), value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>, service: Option<&str>) -> SupabaseConfig {
        SupabaseConfig {
            url: url.map(String::from),
            service_key: service.map(String::from),
            generic_key: None,
            anon_key: None,
        }
    }

    #[test]
    fn test_missing_url_is_a_config_error() {
        let err = SupabaseClient::from_config(&config(None, Some("key"))).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_key_is_a_config_error() {
        let err =
            SupabaseClient::from_config(&config(Some("https://p.supabase.co"), None)).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_malformed_url_is_rejected() {
        let err = SupabaseClient::from_config(&config(Some("not a url"), Some("key"))).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_host_and_trailing_slash() {
        let client =
            SupabaseClient::from_config(&config(Some("https://p.supabase.co/"), Some("key")))
                .unwrap();
        assert_eq!(client.base_url(), "https://p.supabase.co");
        assert_eq!(client.host().as_deref(), Some("p.supabase.co"));
        assert!(client.is_privileged());
    }

    #[test]
    fn test_anon_key_is_not_privileged() {
        let cfg = SupabaseConfig {
            url: Some("https://p.supabase.co".to_string()),
            service_key: None,
            generic_key: None,
            anon_key: Some("anon".to_string()),
        };
        let client = SupabaseClient::from_config(&cfg).unwrap();
        assert_eq!(client.key_type(), KeyType::Anon);
        assert!(!client.is_privileged());
    }
}
