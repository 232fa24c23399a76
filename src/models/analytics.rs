use serde::Serialize;
use std::collections::BTreeMap;

/// GET /api/me/stats
#[derive(Debug, Serialize, PartialEq)]
pub struct StatsResponse {
    pub total_shares: usize,
    pub total_views: i64,
}

/// Denormalized display projection for the top-shares list.
#[derive(Debug, Serialize, PartialEq)]
pub struct TopShare {
    pub code: String,
    pub views: i64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub name: String,
}

/// GET /api/me/analytics
#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub total_shares: usize,
    pub total_views: i64,
    pub avg_views: f64,
    pub recent_shares: usize,
    pub content_types: BTreeMap<String, usize>,
    /// 30-day date skeleton, all buckets zero-filled. The platform keeps no
    /// per-view event log, so real per-day counts are not available here.
    pub views_by_date: BTreeMap<String, i64>,
    pub top_shares: Vec<TopShare>,
}

/// One entry of the synthetic activity feed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub action: String,
    pub item: String,
    pub code: String,
    pub timestamp: Option<String>,
    pub icon: String,
}
