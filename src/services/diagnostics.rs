//! Platform connectivity diagnostics backing /supabase/health.

use crate::config::Config;
use crate::models::{BucketProbe, ConnectionReport};
use crate::supabase::{auth, SupabaseClient};

/// Probe the platform and aggregate a structured report.
///
/// The auth probe always runs (bounded by its timeout). The bucket listing
/// probe runs only with a service key; its failure is a report field, never
/// an error.
pub async fn connection_report(
    config: &Config,
    client: Option<&SupabaseClient>,
    client_error: Option<&str>,
    http: &reqwest::Client,
) -> ConnectionReport {
    let supabase = &config.supabase;

    let auth = auth::auth_health(
        http,
        supabase.url.as_deref(),
        supabase.effective_key(),
        auth::HEALTH_TIMEOUT,
    )
    .await;

    let mut storage_buckets = BucketProbe::default();
    if let Some(client) = client {
        if client.is_privileged() {
            storage_buckets.attempted = true;
            match client.list_buckets().await {
                Ok(count) => storage_buckets.count = Some(count),
                Err(e) => storage_buckets.error = Some(e.to_string()),
            }
        }
    }

    let configured = supabase.is_configured();
    let client_created = client.is_some();
    let ok = auth.ok && (!configured || client_created);

    ConnectionReport {
        configured,
        url_present: supabase.url.is_some(),
        key_present: supabase.effective_key().is_some(),
        key_type: supabase.key_type_label().to_string(),
        client_created,
        client_error: client_error.map(str::to_string),
        auth,
        storage_buckets,
        status: if ok { "ok" } else { "degraded" }.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_report_shape() {
        let config = Config::default();
        let http = reqwest::Client::new();
        let report = connection_report(&config, None, None, &http).await;

        assert!(!report.configured);
        assert!(!report.url_present);
        assert!(!report.key_present);
        assert_eq!(report.key_type, "none");
        assert!(!report.client_created);
        assert!(!report.storage_buckets.attempted);
        assert_eq!(report.status, "degraded");
        assert_eq!(report.auth.error.as_deref(), Some("SUPABASE_URL not set"));
    }
}
