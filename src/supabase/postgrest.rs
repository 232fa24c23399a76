//! Table store surface (PostgREST): filtered selects, inserts, and RPC.

use serde_json::Value;

use crate::supabase::client::SupabaseClient;
use crate::supabase::response::{self, PlatformError};

impl SupabaseClient {
    /// Filtered select against a table. Query pairs use PostgREST syntax,
    /// e.g. `("code", "eq.ABC123")`, `("order", "created_at.desc")`.
    pub async fn select(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Value, PlatformError> {
        let result = self
            .http()
            .get(self.endpoint(&format!("/rest/v1/{}", table)))
            .headers(self.platform_headers())
            .query(query)
            .send()
            .await
            .map_err(|e| PlatformError::transport(&e))?;
        response::read_json(result).await
    }

    /// Insert a row, returning the stored representation.
    pub async fn insert(&self, table: &str, payload: &Value) -> Result<Value, PlatformError> {
        let result = self
            .http()
            .post(self.endpoint(&format!("/rest/v1/{}", table)))
            .headers(self.platform_headers())
            .header("Prefer", "return=representation")
            .json(payload)
            .send()
            .await
            .map_err(|e| PlatformError::transport(&e))?;
        response::read_json(result).await
    }

    /// Call a server-side function.
    pub async fn rpc(&self, function: &str, params: &Value) -> Result<Value, PlatformError> {
        let result = self
            .http()
            .post(self.endpoint(&format!("/rest/v1/rpc/{}", function)))
            .headers(self.platform_headers())
            .json(params)
            .send()
            .await
            .map_err(|e| PlatformError::transport(&e))?;
        response::read_json(result).await
    }
}
