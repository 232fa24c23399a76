//! Object storage surface: uploads, URL minting, downloads, bucket probes.

use bytes::Bytes;
use serde_json::{json, Value};

use crate::supabase::client::SupabaseClient;
use crate::supabase::response::{self, PlatformError};

impl SupabaseClient {
    /// Upload an object. The path is the flat `<code>-<ts>.<ext>` scheme, so
    /// no per-segment encoding is needed.
    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), PlatformError> {
        let mut request = self
            .http()
            .post(self.endpoint(&format!("/storage/v1/object/{}/{}", bucket, path)))
            .headers(self.platform_headers())
            .body(data);
        if let Some(ct) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, ct);
        }

        let result = request
            .send()
            .await
            .map_err(|e| PlatformError::transport(&e))?;
        response::read_json(result).await.map(|_| ())
    }

    /// Whether the bucket serves objects without authentication.
    pub async fn bucket_is_public(&self, bucket: &str) -> Result<bool, PlatformError> {
        let result = self
            .http()
            .get(self.endpoint(&format!("/storage/v1/bucket/{}", bucket)))
            .headers(self.platform_headers())
            .send()
            .await
            .map_err(|e| PlatformError::transport(&e))?;
        let info = response::read_json(result).await?;
        Ok(info.get("public").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Public URL for an object in a public bucket (constructed, not probed).
    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        self.endpoint(&format!("/storage/v1/object/public/{}/{}", bucket, path))
    }

    /// Mint a signed URL valid for `expires_in` seconds.
    pub async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: u64,
    ) -> Result<String, PlatformError> {
        let result = self
            .http()
            .post(self.endpoint(&format!("/storage/v1/object/sign/{}/{}", bucket, path)))
            .headers(self.platform_headers())
            .json(&json!({ "expiresIn": expires_in }))
            .send()
            .await
            .map_err(|e| PlatformError::transport(&e))?;
        let body = response::read_json(result).await?;

        let signed = body
            .get("signedURL")
            .or_else(|| body.get("signedUrl"))
            .and_then(Value::as_str)
            .ok_or_else(|| PlatformError {
                status: None,
                code: None,
                message: "Signing response carried no URL".to_string(),
            })?;
        Ok(self.absolutize_signed_url(signed))
    }

    /// The storage API returns signed URLs relative to `/storage/v1`.
    fn absolutize_signed_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            signed.to_string()
        } else if signed.starts_with("/storage/v1") {
            self.endpoint(signed)
        } else if signed.starts_with('/') {
            self.endpoint(&format!("/storage/v1{}", signed))
        } else {
            self.endpoint(&format!("/storage/v1/{}", signed))
        }
    }

    /// Privileged direct download of an object's bytes.
    pub async fn download_object(
        &self,
        bucket: &str,
        path: &str,
    ) -> Result<(Bytes, Option<String>), PlatformError> {
        let result = self
            .http()
            .get(self.endpoint(&format!("/storage/v1/object/{}/{}", bucket, path)))
            .headers(self.platform_headers())
            .send()
            .await
            .map_err(|e| PlatformError::transport(&e))?;

        let status = result.status();
        if !status.is_success() {
            let text = result.text().await.unwrap_or_default();
            return Err(PlatformError {
                status: Some(status.as_u16()),
                code: None,
                message: if text.is_empty() {
                    format!("Download failed with status {}", status)
                } else {
                    text
                },
            });
        }

        let content_type = result
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = result
            .bytes()
            .await
            .map_err(|e| PlatformError::transport(&e))?;
        Ok((data, content_type))
    }

    /// List buckets; requires a service-role key. Used only by diagnostics.
    pub async fn list_buckets(&self) -> Result<usize, PlatformError> {
        let result = self
            .http()
            .get(self.endpoint("/storage/v1/bucket"))
            .headers(self.platform_headers())
            .send()
            .await
            .map_err(|e| PlatformError::transport(&e))?;
        let body = response::read_json(result).await?;
        Ok(body.as_array().map(Vec::len).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupabaseConfig;

    fn client() -> SupabaseClient {
        SupabaseClient::from_config(&SupabaseConfig {
            url: Some("https://p.supabase.co".to_string()),
            service_key: Some("key".to_string()),
            generic_key: None,
            anon_key: None,
        })
        .unwrap()
    }

    #[test]
    fn test_public_url_layout() {
        let url = client().public_object_url("shared-files", "ABC123-1700000000.png");
        assert_eq!(
            url,
            "https://p.supabase.co/storage/v1/object/public/shared-files/ABC123-1700000000.png"
        );
    }

    #[test]
    fn test_signed_url_absolutized() {
        let c = client();
        assert_eq!(
            c.absolutize_signed_url("/object/sign/b/p?token=t"),
            "https://p.supabase.co/storage/v1/object/sign/b/p?token=t"
        );
        assert_eq!(
            c.absolutize_signed_url("/storage/v1/object/sign/b/p?token=t"),
            "https://p.supabase.co/storage/v1/object/sign/b/p?token=t"
        );
        assert_eq!(
            c.absolutize_signed_url("https://cdn.example/x"),
            "https://cdn.example/x"
        );
    }
}
