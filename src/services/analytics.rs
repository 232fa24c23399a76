//! Per-user aggregation: stats, analytics and the synthetic activity feed.
//!
//! Pure functions over already-fetched share rows, so everything here is
//! testable without the platform.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::models::{ActivityEvent, AnalyticsResponse, ShareRow, StatsResponse, TopShare};

const HISTOGRAM_DAYS: i64 = 30;
const RECENT_WINDOW_DAYS: i64 = 7;
const TOP_SHARES_LIMIT: usize = 5;
pub const ACTIVITY_LIMIT: usize = 20;

/// Stats are computed from a `view_count`-only projection; the full rows are
/// never needed.
pub fn compute_stats(view_counts: &[i64]) -> StatsResponse {
    StatsResponse {
        total_shares: view_counts.len(),
        total_views: view_counts.iter().sum(),
    }
}

pub fn compute_analytics(rows: &[ShareRow], now: DateTime<Utc>) -> AnalyticsResponse {
    let total_shares = rows.len();
    let total_views: i64 = rows.iter().map(|r| r.view_count).sum();

    let avg_views = if total_shares > 0 {
        (total_views as f64 / total_shares as f64 * 100.0).round() / 100.0
    } else {
        0.0
    };

    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    let recent_shares = rows
        .iter()
        .filter_map(|r| parse_timestamp(r.created_at.as_deref()))
        .filter(|t| *t > cutoff)
        .count();

    let mut content_types: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        *content_types.entry(row.content_type.clone()).or_default() += 1;
    }

    // Zero-filled date skeleton only: the platform keeps no per-view events,
    // so there is nothing to aggregate into the buckets.
    let mut views_by_date: BTreeMap<String, i64> = BTreeMap::new();
    for i in 0..HISTOGRAM_DAYS {
        let date = (now - Duration::days(i)).format("%Y-%m-%d").to_string();
        views_by_date.insert(date, 0);
    }

    let mut by_views: Vec<&ShareRow> = rows.iter().collect();
    by_views.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    let top_shares = by_views
        .into_iter()
        .take(TOP_SHARES_LIMIT)
        .map(|r| TopShare {
            code: r.code.clone(),
            views: r.view_count,
            content_type: r.content_type.clone(),
            name: r
                .file_name
                .clone()
                .unwrap_or_else(|| "Text Share".to_string()),
        })
        .collect();

    AnalyticsResponse {
        total_shares,
        total_views,
        avg_views,
        recent_shares,
        content_types,
        views_by_date,
        top_shares,
    }
}

/// Derive the synthetic activity feed: one "created" event per share, plus a
/// "viewed" event when the share has views. Sorted newest first, capped at
/// twenty entries.
pub fn build_activity(rows: &[ShareRow]) -> Vec<ActivityEvent> {
    let mut events = Vec::with_capacity(rows.len() * 2);

    for share in rows {
        let item = share
            .file_name
            .clone()
            .unwrap_or_else(|| share.code.clone());

        events.push(ActivityEvent {
            kind: "share_created".to_string(),
            action: "Created share".to_string(),
            item: item.clone(),
            code: share.code.clone(),
            timestamp: share.created_at.clone(),
            icon: "\u{1F4E4}".to_string(),
        });

        if share.view_count > 0 {
            events.push(ActivityEvent {
                kind: "share_viewed".to_string(),
                action: format!("Share viewed ({} times)", share.view_count),
                item,
                code: share.code.clone(),
                timestamp: share.updated_at.clone().or_else(|| share.created_at.clone()),
                icon: "\u{1F441}\u{FE0F}".to_string(),
            });
        }
    }

    // ISO-8601 timestamps sort lexicographically
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events.truncate(ACTIVITY_LIMIT);
    events
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn share(code: &str, views: i64, created_at: &str) -> ShareRow {
        ShareRow {
            code: code.to_string(),
            content_type: "text".to_string(),
            text_content: None,
            file_name: None,
            file_size: None,
            file_url: None,
            user_id: Some("u1".to_string()),
            view_count: views,
            created_at: Some(created_at.to_string()),
            updated_at: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_stats_sums_views() {
        assert_eq!(
            compute_stats(&[3, 4, 0]),
            StatsResponse {
                total_shares: 3,
                total_views: 7
            }
        );
        assert_eq!(
            compute_stats(&[]),
            StatsResponse {
                total_shares: 0,
                total_views: 0
            }
        );
    }

    #[test]
    fn test_avg_views_rounded_to_two_decimals() {
        let rows = vec![
            share("A", 1, "2026-08-01T00:00:00+00:00"),
            share("B", 1, "2026-08-02T00:00:00+00:00"),
            share("C", 0, "2026-08-03T00:00:00+00:00"),
        ];
        let analytics = compute_analytics(&rows, now());
        assert_eq!(analytics.avg_views, 0.67);
    }

    #[test]
    fn test_avg_views_zero_without_shares() {
        let analytics = compute_analytics(&[], now());
        assert_eq!(analytics.avg_views, 0.0);
        assert_eq!(analytics.total_shares, 0);
        assert!(analytics.top_shares.is_empty());
    }

    #[test]
    fn test_recent_share_window_is_seven_days() {
        let rows = vec![
            share("A", 0, "2026-08-25T00:00:00+00:00"),
            share("B", 0, "2026-08-21T00:00:00+00:00"),
            share("C", 0, "2026-08-10T00:00:00+00:00"),
            // Unparseable timestamps are skipped, not counted
            share("D", 0, "not-a-timestamp"),
        ];
        let analytics = compute_analytics(&rows, now());
        assert_eq!(analytics.recent_shares, 2);
    }

    #[test]
    fn test_histogram_skeleton_is_zero_filled() {
        let analytics = compute_analytics(&[share("A", 9, "2026-08-25T00:00:00+00:00")], now());
        assert_eq!(analytics.views_by_date.len(), 30);
        assert!(analytics.views_by_date.values().all(|v| *v == 0));
        assert!(analytics.views_by_date.contains_key("2026-08-26"));
        assert!(analytics.views_by_date.contains_key("2026-07-28"));
    }

    #[test]
    fn test_content_type_distribution() {
        let mut file_share = share("F", 0, "2026-08-01T00:00:00+00:00");
        file_share.content_type = "file".to_string();
        let rows = vec![
            share("A", 0, "2026-08-01T00:00:00+00:00"),
            share("B", 0, "2026-08-02T00:00:00+00:00"),
            file_share,
        ];
        let analytics = compute_analytics(&rows, now());
        assert_eq!(analytics.content_types.get("text"), Some(&2));
        assert_eq!(analytics.content_types.get("file"), Some(&1));
    }

    #[test]
    fn test_top_shares_limited_to_five_with_name_fallback() {
        let mut rows: Vec<ShareRow> = (0..8)
            .map(|i| share(&format!("S{}", i), i, "2026-08-01T00:00:00+00:00"))
            .collect();
        rows[5].file_name = Some("photo.png".to_string());

        let analytics = compute_analytics(&rows, now());
        assert_eq!(analytics.top_shares.len(), 5);
        assert_eq!(analytics.top_shares[0].code, "S7");
        assert_eq!(analytics.top_shares[0].views, 7);
        assert!(analytics
            .top_shares
            .windows(2)
            .all(|w| w[0].views >= w[1].views));
        let s5 = analytics.top_shares.iter().find(|t| t.code == "S5").unwrap();
        assert_eq!(s5.name, "photo.png");
        let s7 = &analytics.top_shares[0];
        assert_eq!(s7.name, "Text Share");
    }

    #[test]
    fn test_activity_events_per_share() {
        let mut viewed = share("V", 3, "2026-08-02T00:00:00+00:00");
        viewed.updated_at = Some("2026-08-05T00:00:00+00:00".to_string());
        let rows = vec![share("A", 0, "2026-08-03T00:00:00+00:00"), viewed];

        let events = build_activity(&rows);
        assert_eq!(events.len(), 3);
        // Viewed event uses updated_at and sorts first
        assert_eq!(events[0].kind, "share_viewed");
        assert_eq!(events[0].action, "Share viewed (3 times)");
        assert_eq!(
            events[0].timestamp.as_deref(),
            Some("2026-08-05T00:00:00+00:00")
        );
        assert_eq!(events[1].code, "A");
        assert_eq!(events[2].kind, "share_created");
    }

    #[test]
    fn test_activity_truncated_to_twenty() {
        // 15 shares with views produce 30 candidate events
        let rows: Vec<ShareRow> = (0..15)
            .map(|i| share(&format!("S{}", i), 1, &format!("2026-08-{:02}T00:00:00+00:00", i + 1)))
            .collect();
        let events = build_activity(&rows);
        assert_eq!(events.len(), 20);
        assert!(events
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp));
    }
}
