//! Offline unit tests for scout-db pool configuration and row types.
//! These tests do not require a live database connection.

use scout_core::{AppConfig, Environment};
use scout_db::{CreatorRow, CycleRunRow, LabelCount, PoolConfig, UpsertResult};
use std::path::PathBuf;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        discovery_path: PathBuf::from("./config/discovery.yaml"),
        extract_base_url: "http://127.0.0.1:8088".to_string(),
        extract_timeout_secs: 30,
        user_agent: "ua".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        cycle_interval_secs: 3600,
        fetch_concurrency: 4,
        fetch_max_attempts: 3,
        retry_backoff_base_ms: 1000,
        retry_backoff_ceiling_ms: 60_000,
        reconcile_concurrency: 4,
        store_raw: false,
        block_after_failed_cycles: None,
        history_limit: 100,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`CreatorRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn creator_row_has_expected_fields() {
    use chrono::Utc;

    let now = Utc::now();
    let row = CreatorRow {
        id: 1_i64,
        source: "instagram".to_string(),
        profile_url: "https://www.instagram.com/fit.jane/".to_string(),
        handle: Some("fit.jane".to_string()),
        display_name: None,
        bio: Some("coach".to_string()),
        niche: Some("fitness".to_string()),
        public_contact_email: None,
        location: None,
        follower_count: Some(12_500),
        following_count: None,
        post_count: Some(310),
        engagement_rate: Some(0.034),
        top_posts: serde_json::json!([]),
        recent_posts_sample: serde_json::json!([]),
        avatar_url: None,
        raw: None,
        scraped_at: now,
        created_at: now,
        updated_at: now,
    };

    assert_eq!(row.source, "instagram");
    assert_eq!(row.follower_count, Some(12_500));
    assert!(row.top_posts.as_array().is_some_and(Vec::is_empty));
    assert!(row.raw.is_none());
}

#[test]
fn cycle_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = CycleRunRow {
        id: 3,
        public_id: Uuid::new_v4(),
        cycle_number: 12,
        started_at: Utc::now(),
        duration_ms: 1_500,
        discovered: 5,
        filtered_out: 0,
        deduped_out: 2,
        blocked: 0,
        fetch_attempts: 4,
        successes: 3,
        soft_failures: 1,
        hard_failures: 0,
        records_inserted: 3,
        records_updated: 0,
        records_rejected: 0,
        degradations: serde_json::json!([]),
        created_at: Utc::now(),
    };

    assert_eq!(row.discovered - row.deduped_out, row.successes);
    assert_eq!(row.fetch_attempts, row.successes + row.soft_failures);
}

#[test]
fn upsert_result_and_label_count_compare_by_value() {
    let a = UpsertResult {
        id: 9,
        inserted: true,
    };
    assert_eq!(
        a,
        UpsertResult {
            id: 9,
            inserted: true
        }
    );

    let fitness = LabelCount {
        label: "fitness".to_string(),
        count: 4,
    };
    assert_eq!(fitness.clone(), fitness);
}
