use serde::{Deserialize, Serialize};

/// A row from the `shares` table.
///
/// `view_count`, `created_at` and `updated_at` are maintained by the data
/// platform; this service only ever writes the rest at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRow {
    pub code: String,
    /// Rows written by other clients may omit this; they count as "unknown"
    /// in the analytics views rather than failing the whole fetch.
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_content_type() -> String {
    "unknown".to_string()
}

/// JSON body for POST /api/shares (text-only form)
#[derive(Debug, Default, Deserialize)]
pub struct CreateShareRequest {
    pub code: Option<String>,
    pub text: Option<String>,
}

/// A file carried in a multipart creation request.
#[derive(Debug)]
pub struct UploadedFile {
    pub name: Option<String>,
    pub content_type: Option<String>,
    pub data: bytes::Bytes,
}

/// Normalized creation input, assembled from either body form.
#[derive(Debug, Default)]
pub struct ShareInput {
    pub code: Option<String>,
    pub text: Option<String>,
    pub file: Option<UploadedFile>,
    pub user_id: Option<String>,
}

/// Response body for a successful creation.
#[derive(Debug, Serialize)]
pub struct CreateShareResponse {
    pub code: String,
    pub content_type: String,
    pub text_content: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub row: serde_json::Value,
    pub status: String,
}

/// Projection returned by GET /api/me/shares
#[derive(Debug, Serialize, Deserialize)]
pub struct ShareListItem {
    pub code: String,
    pub content_type: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub view_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_row_missing_content_type_falls_back_to_unknown() {
        let row: ShareRow = serde_json::from_str(r#"{"code": "ABC123"}"#).unwrap();
        assert_eq!(row.content_type, "unknown");
        assert_eq!(row.view_count, 0);
        assert!(row.file_name.is_none());
    }
}
