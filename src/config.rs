use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Data platform (Supabase) connection settings.
///
/// Keys are kept separate so the factory can classify the effective key:
/// a service-role key unlocks privileged storage calls, the anon key does not.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SupabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub service_key: Option<String>,
    #[serde(default)]
    pub generic_key: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_code_length")]
    pub code_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_origins")]
    pub origins: Vec<String>,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024 // 10 MiB
}

fn default_bucket() -> String {
    "shared-files".to_string()
}

fn default_code_length() -> usize {
    6
}

fn default_cors_origins() -> Vec<String> {
    [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://localhost:8080",
        "http://localhost:8081",
        "http://127.0.0.1:8080",
        "http://127.0.0.1:8081",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            bucket: default_bucket(),
            code_length: default_code_length(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            supabase: SupabaseConfig::default(),
            upload: UploadConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

/// Common placeholder values that should be treated as "not configured".
fn normalize_secret(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.to_lowercase().as_str() {
        "your-key-or-anon-key" | "changeme" | "<set-me>" => None,
        _ => Some(trimmed.to_string()),
    }
}

impl SupabaseConfig {
    /// The effective API key, preferring service role over generic over anon.
    pub fn effective_key(&self) -> Option<&str> {
        self.service_key
            .as_deref()
            .or(self.generic_key.as_deref())
            .or(self.anon_key.as_deref())
    }

    pub fn key_type_label(&self) -> &'static str {
        if self.service_key.is_some() {
            "service"
        } else if self.generic_key.is_some() {
            "unknown"
        } else if self.anon_key.is_some() {
            "anon"
        } else {
            "none"
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.effective_key().is_some()
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from config.toml if present
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("HOST") {
            if !val.trim().is_empty() {
                self.server.host = val;
            }
        }
        if let Ok(val) = env::var("PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        // Supabase overrides
        if let Ok(val) = env::var("SUPABASE_URL") {
            if !val.trim().is_empty() {
                self.supabase.url = Some(val.trim().to_string());
            }
        }
        let service = env::var("SUPABASE_SERVICE_ROLE_KEY")
            .or_else(|_| env::var("SUPABASE_SERVICE_KEY"))
            .ok();
        if let Some(key) = normalize_secret(service) {
            self.supabase.service_key = Some(key);
        }
        if let Some(key) = normalize_secret(env::var("SUPABASE_KEY").ok()) {
            self.supabase.generic_key = Some(key);
        }
        if let Some(key) = normalize_secret(env::var("SUPABASE_ANON_KEY").ok()) {
            self.supabase.anon_key = Some(key);
        }

        // Upload overrides
        if let Ok(val) = env::var("MAX_FILE_SIZE") {
            if let Ok(size) = val.parse() {
                self.upload.max_file_size = size;
            }
        }
        if let Ok(val) = env::var("SHARE_BUCKET") {
            if !val.trim().is_empty() {
                self.upload.bucket = val;
            }
        }

        // CORS overrides: comma-separated origin list
        if let Ok(val) = env::var("CORS_ORIGINS") {
            let origins: Vec<String> = val
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            if !origins.is_empty() {
                self.cors.origins = origins;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_keys_are_ignored() {
        assert_eq!(normalize_secret(Some("changeme".to_string())), None);
        assert_eq!(normalize_secret(Some("YOUR-KEY-OR-ANON-KEY".to_string())), None);
        assert_eq!(normalize_secret(Some("  ".to_string())), None);
        assert_eq!(
            normalize_secret(Some(" real-key ".to_string())),
            Some("real-key".to_string())
        );
    }

    #[test]
    fn test_key_classification_prefers_service_role() {
        let cfg = SupabaseConfig {
            url: Some("https://project.supabase.co".to_string()),
            service_key: Some("srv".to_string()),
            generic_key: Some("gen".to_string()),
            anon_key: Some("anon".to_string()),
        };
        assert_eq!(cfg.effective_key(), Some("srv"));
        assert_eq!(cfg.key_type_label(), "service");

        let cfg = SupabaseConfig {
            url: Some("https://project.supabase.co".to_string()),
            service_key: None,
            generic_key: Some("gen".to_string()),
            anon_key: Some("anon".to_string()),
        };
        assert_eq!(cfg.effective_key(), Some("gen"));
        assert_eq!(cfg.key_type_label(), "unknown");

        let cfg = SupabaseConfig {
            url: Some("https://project.supabase.co".to_string()),
            service_key: None,
            generic_key: None,
            anon_key: Some("anon".to_string()),
        };
        assert_eq!(cfg.key_type_label(), "anon");

        let cfg = SupabaseConfig::default();
        assert_eq!(cfg.key_type_label(), "none");
        assert!(!cfg.is_configured());
    }
}
