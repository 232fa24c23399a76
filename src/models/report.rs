use serde::Serialize;

/// Result of probing the auth service health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AuthHealth {
    pub ok: bool,
    pub status: Option<u16>,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Result of the privileged bucket-listing probe.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BucketProbe {
    pub attempted: bool,
    pub count: Option<usize>,
    pub error: Option<String>,
}

/// Structured platform connectivity report served at /supabase/health.
#[derive(Debug, Serialize)]
pub struct ConnectionReport {
    pub configured: bool,
    pub url_present: bool,
    pub key_present: bool,
    pub key_type: String,
    pub client_created: bool,
    pub client_error: Option<String>,
    pub auth: AuthHealth,
    pub storage_buckets: BucketProbe,
    pub status: String,
}
