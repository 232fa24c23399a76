//! Share creation and short-code resolution.

use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};

use crate::config::UploadConfig;
use crate::error::{AppError, Result};
use crate::models::{CreateShareResponse, ShareInput};
use crate::supabase::SupabaseClient;

const SHARES_TABLE: &str = "shares";
const LOOKUP_RPC: &str = "get_share_by_code";
const SIGNED_URL_TTL_SECS: u64 = 24 * 3600;

/// Uppercase alphanumeric charset for generated codes.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a share code of the given length.
///
/// Uniqueness is not enforced here: at 36^6 combinations a collision is
/// vanishingly unlikely at this scale, and the table's unique constraint is
/// the backstop. Caller-supplied codes skip this entirely and are stored
/// as-is, unvalidated.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Trim text content; empty becomes absent.
pub fn normalize_text(text: Option<String>) -> Option<String> {
    let text = text?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Storage path for an upload: `<code>-<unix_ts>.<ext>`, extension taken from
/// the original name, defaulting to `bin`. Also returns the effective file
/// name (a fallback is generated when the upload carried none).
pub fn derive_storage_path(
    code: &str,
    file_name: Option<&str>,
    timestamp: i64,
) -> (String, String) {
    let name = match file_name {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => format!("upload-{}", timestamp),
    };
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_string(),
        _ => "bin".to_string(),
    };
    (format!("{}-{}.{}", code, timestamp, ext), name)
}

/// An internal `proxy:<bucket>/<path>` marker, split into its parts.
pub fn parse_proxy_marker(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("proxy:")?;
    let (bucket, path) = rest.split_once('/')?;
    if bucket.is_empty() || path.is_empty() {
        return None;
    }
    Some((bucket, path))
}

/// Normalize an RPC lookup payload to at most one row.
///
/// The function may return a single record or a list; a record with every
/// field null is the procedure's convention for "expired or absent", and an
/// empty object carries no row either.
pub fn rpc_row(data: Value) -> Option<Value> {
    let row = match data {
        Value::Array(mut rows) => {
            if rows.is_empty() {
                return None;
            }
            rows.swap_remove(0)
        }
        other => other,
    };
    match &row {
        Value::Null => None,
        Value::Object(map) => {
            if map.is_empty() || map.values().all(Value::is_null) {
                None
            } else {
                Some(row)
            }
        }
        _ => Some(row),
    }
}

/// Create a share from normalized input, uploading the file (if any) and
/// persisting the row.
pub async fn create_share(
    client: &SupabaseClient,
    upload: &UploadConfig,
    input: ShareInput,
) -> Result<CreateShareResponse> {
    let code = match input.code {
        Some(code) if !code.trim().is_empty() => code.trim().to_string(),
        _ => generate_code(upload.code_length),
    };
    let text_content = normalize_text(input.text);

    let mut file_name: Option<String> = None;
    let mut file_size: Option<i64> = None;
    let mut file_url: Option<String> = None;
    let mut had_file = false;

    if let Some(file) = input.file {
        let present = file.name.as_deref().is_some_and(|n| !n.is_empty()) || !file.data.is_empty();
        if present {
            had_file = true;
            if file.data.len() > upload.max_file_size {
                return Err(AppError::BadRequest("File too large".to_string()));
            }

            let now_ts = Utc::now().timestamp();
            let (path, name) = derive_storage_path(&code, file.name.as_deref(), now_ts);
            let size = file.data.len() as i64;

            client
                .upload_object(
                    &upload.bucket,
                    &path,
                    file.data,
                    file.content_type.as_deref(),
                )
                .await
                .map_err(|e| AppError::Platform(format!("Upload failed: {}", e)))?;

            let url = resolve_file_url(client, &upload.bucket, &path).await;

            file_name = Some(name);
            file_size = Some(size);
            file_url = Some(url);
        }
    }

    // A share counts as "file" whenever a file was supplied, even if URL
    // resolution fell all the way through to the proxy marker.
    let content_type = if had_file { "file" } else { "text" };

    let mut payload = json!({
        "code": code,
        "content_type": content_type,
        "text_content": text_content,
        "file_name": file_name,
        "file_size": file_size,
        "file_url": file_url,
    });
    if let Some(user_id) = &input.user_id {
        payload["user_id"] = json!(user_id);
    }

    let row = client
        .insert(SHARES_TABLE, &payload)
        .await
        .map_err(|e| {
            if e.is_rls_violation() {
                AppError::Forbidden(
                    "Insert blocked by RLS; ensure service role key is used on the backend and policies permit insert."
                        .to_string(),
                )
            } else if e.is_unauthorized() {
                AppError::Unauthorized(
                    "Unauthorized to insert; check SUPABASE_SERVICE_ROLE_KEY is set and valid."
                        .to_string(),
                )
            } else {
                AppError::Platform(format!("Failed to create share: {}", e))
            }
        })?;

    Ok(CreateShareResponse {
        code,
        content_type: content_type.to_string(),
        text_content,
        file_url,
        file_name,
        file_size,
        row,
        status: "ok".to_string(),
    })
}

/// Resolve the retrievable URL for an uploaded object.
///
/// Order: public URL when the bucket is public, then a 24-hour signed URL,
/// then the internal proxy marker — the marker keeps private-bucket shares
/// retrievable through this service at the cost of an extra hop.
async fn resolve_file_url(client: &SupabaseClient, bucket: &str, path: &str) -> String {
    match client.bucket_is_public(bucket).await {
        Ok(true) => return client.public_object_url(bucket, path),
        Ok(false) => {}
        Err(e) => tracing::warn!("Bucket visibility probe failed for {}: {}", bucket, e),
    }

    match client.create_signed_url(bucket, path, SIGNED_URL_TTL_SECS).await {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(
                "No public or signed URL for {}/{}, falling back to proxy marker: {}",
                bucket,
                path,
                e
            );
            format!("proxy:{}/{}", bucket, path)
        }
    }
}

/// Resolve a share by code.
///
/// Primary path is the business-rule-aware RPC (which may enforce expiry and
/// bump the view count); a transport or platform error there falls back to a
/// raw row lookup. An RPC success with no row means expired or absent and is
/// NOT retried against the table.
pub async fn resolve_share(client: &SupabaseClient, code: &str) -> Result<Value> {
    let normalized = code.to_uppercase();

    // Deployed procedures differ on the parameter name; try both.
    let mut rpc_error = None;
    for param in ["_code", "code"] {
        match client.rpc(LOOKUP_RPC, &json!({ (param): &normalized })).await {
            Ok(data) => {
                return rpc_row(data)
                    .ok_or_else(|| AppError::NotFound("Not found".to_string()));
            }
            Err(e) => {
                tracing::debug!("Share lookup RPC with param '{}' failed: {}", param, e);
                rpc_error = Some(e);
            }
        }
    }

    if let Some(e) = rpc_error {
        tracing::warn!("Share lookup RPC unavailable, falling back to table select: {}", e);
    }

    let rows = client
        .select(
            SHARES_TABLE,
            &[
                ("select", "*".to_string()),
                ("code", format!("eq.{}", normalized)),
                ("limit", "1".to_string()),
            ],
        )
        .await
        .map_err(|e| AppError::Platform(e.to_string()))?;

    match rows {
        Value::Array(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
        _ => Err(AppError::NotFound("Not found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupabaseConfig;
    use crate::models::UploadedFile;
    use bytes::Bytes;

    #[test]
    fn test_generated_code_charset_and_length() {
        for _ in 0..50 {
            let code = generate_code(6);
            assert_eq!(code.len(), 6);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
        assert_eq!(generate_code(8).len(), 8);
    }

    #[test]
    fn test_text_normalization() {
        assert_eq!(normalize_text(None), None);
        assert_eq!(normalize_text(Some("".to_string())), None);
        assert_eq!(normalize_text(Some("   ".to_string())), None);
        assert_eq!(
            normalize_text(Some("  hello ".to_string())),
            Some("hello".to_string())
        );
    }

    #[test]
    fn test_storage_path_derivation() {
        let (path, name) = derive_storage_path("ABC123", Some("report.pdf"), 1_700_000_000);
        assert_eq!(path, "ABC123-1700000000.pdf");
        assert_eq!(name, "report.pdf");

        // No extension defaults to bin
        let (path, _) = derive_storage_path("ABC123", Some("README"), 1_700_000_000);
        assert_eq!(path, "ABC123-1700000000.bin");

        // Missing name gets a generated fallback
        let (path, name) = derive_storage_path("ABC123", None, 1_700_000_000);
        assert_eq!(name, "upload-1700000000");
        assert_eq!(path, "ABC123-1700000000.bin");
    }

    #[test]
    fn test_proxy_marker_parsing() {
        assert_eq!(
            parse_proxy_marker("proxy:shared-files/ABC-1.png"),
            Some(("shared-files", "ABC-1.png"))
        );
        assert_eq!(
            parse_proxy_marker("proxy:b/nested/path.bin"),
            Some(("b", "nested/path.bin"))
        );
        assert_eq!(parse_proxy_marker("proxy:no-slash"), None);
        assert_eq!(parse_proxy_marker("proxy:/missing-bucket"), None);
        assert_eq!(parse_proxy_marker("https://host/x"), None);
    }

    #[test]
    fn test_rpc_row_normalization() {
        // List payload takes the first element
        let row = rpc_row(serde_json::json!([{"code": "A"}, {"code": "B"}])).unwrap();
        assert_eq!(row["code"], "A");

        // Empty list, null, empty object, all-null record: no row
        assert_eq!(rpc_row(serde_json::json!([])), None);
        assert_eq!(rpc_row(Value::Null), None);
        assert_eq!(rpc_row(serde_json::json!({})), None);
        assert_eq!(
            rpc_row(serde_json::json!({"code": null, "text_content": null})),
            None
        );

        // A record with any non-null field is a hit
        assert!(rpc_row(serde_json::json!({"code": "X", "text_content": null})).is_some());
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_before_upload() {
        // Unroutable TEST-NET-1 address: any platform call against it fails
        // as Platform, so a BadRequest proves the size guard ran before the
        // upload and the insert.
        let client = SupabaseClient::from_config(&SupabaseConfig {
            url: Some("http://192.0.2.1:9".to_string()),
            service_key: Some("key".to_string()),
            generic_key: None,
            anon_key: None,
        })
        .unwrap();
        let upload = UploadConfig {
            max_file_size: 4,
            bucket: "shared-files".to_string(),
            code_length: 6,
        };
        let input = ShareInput {
            file: Some(UploadedFile {
                name: Some("big.bin".to_string()),
                content_type: None,
                data: Bytes::from_static(b"12345"),
            }),
            ..Default::default()
        };

        match create_share(&client, &upload, input).await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "File too large"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }
}
