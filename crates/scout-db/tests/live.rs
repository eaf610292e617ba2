//! Live integration tests for scout-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. They are ignored by default; run them with
//! `DATABASE_URL` set and `cargo test -p scout-db -- --ignored`.

use chrono::{Duration, Utc};
use scout_core::{Candidate, Niche, Platform, Post, ProfileRecord};
use scout_db::{
    count_discovered_candidates, creator_stats, existing_profile_urls, get_creator_by_url,
    insert_cycle_run, insert_discovered_candidates, list_recent_cycle_runs, list_top_creators,
    upsert_creator, DbError, NewCycleRun,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_record(handle: &str, followers: Option<i64>) -> ProfileRecord {
    let url = Platform::Instagram.profile_url(handle);
    let mut record = ProfileRecord::new(Platform::Instagram, url);
    record.handle = Some(handle.to_string());
    record.bio = Some("Personal trainer and gym coach".to_string());
    record.niche = Some(Niche::Fitness);
    record.follower_count = followers;
    record.engagement_rate = Some(0.05);
    record.top_posts = vec![Post {
        url: "https://www.instagram.com/p/abc/".to_string(),
        timestamp: Some(Utc::now()),
        views: None,
        likes: Some(100),
        comments: Some(5),
        caption: Some("leg day".to_string()),
        engagement_rate: Some(0.01),
    }];
    record
}

fn make_run(cycle_number: i64, offset_secs: i64) -> NewCycleRun {
    NewCycleRun {
        public_id: Uuid::new_v4(),
        cycle_number,
        started_at: Utc::now() + Duration::seconds(offset_secs),
        duration_ms: 250,
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
    }
}

// ---------------------------------------------------------------------------
// creators
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_inserts_then_updates_single_row(pool: sqlx::PgPool) {
    let record = make_record("fit.jane", Some(10_000));

    let first = upsert_creator(&pool, &record).await.expect("first upsert");
    assert!(first.inserted);

    let mut newer = record.clone();
    newer.follower_count = Some(12_000);
    newer.scraped_at = Utc::now();
    let second = upsert_creator(&pool, &newer).await.expect("second upsert");
    assert!(!second.inserted);
    assert_eq!(first.id, second.id);

    let row = get_creator_by_url(&pool, &record.profile_url)
        .await
        .expect("row exists");
    assert_eq!(row.follower_count, Some(12_000));
    assert_eq!(row.niche.as_deref(), Some("fitness"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_is_idempotent(pool: sqlx::PgPool) {
    let record = make_record("chef_mo", Some(50_000));

    upsert_creator(&pool, &record).await.expect("first upsert");
    let after_once = get_creator_by_url(&pool, &record.profile_url).await.unwrap();

    upsert_creator(&pool, &record).await.expect("second upsert");
    let after_twice = get_creator_by_url(&pool, &record.profile_url).await.unwrap();

    assert_eq!(after_once.id, after_twice.id);
    assert_eq!(after_once.follower_count, after_twice.follower_count);
    assert_eq!(after_once.bio, after_twice.bio);
    assert_eq!(after_once.top_posts, after_twice.top_posts);
    assert_eq!(after_once.scraped_at, after_twice.scraped_at);
    assert!(after_twice.updated_at >= after_once.updated_at);

    let stats = creator_stats(&pool).await.unwrap();
    assert_eq!(stats.total, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_keeps_stored_values_when_new_ones_are_missing(pool: sqlx::PgPool) {
    let record = make_record("keeps", Some(7_000));
    upsert_creator(&pool, &record).await.unwrap();

    let mut sparse = ProfileRecord::new(Platform::Instagram, record.profile_url.clone());
    sparse.post_count = Some(12);
    upsert_creator(&pool, &sparse).await.unwrap();

    let row = get_creator_by_url(&pool, &record.profile_url).await.unwrap();
    assert_eq!(row.follower_count, Some(7_000));
    assert_eq!(row.bio.as_deref(), Some("Personal trainer and gym coach"));
    assert_eq!(row.post_count, Some(12));
    assert_eq!(row.top_posts.as_array().map(Vec::len), Some(1));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn existing_profile_urls_returns_only_persisted(pool: sqlx::PgPool) {
    let a = make_record("alpha", None);
    let b = make_record("beta", None);
    upsert_creator(&pool, &a).await.unwrap();
    upsert_creator(&pool, &b).await.unwrap();

    let query = vec![
        a.profile_url.clone(),
        Platform::Instagram.profile_url("gamma"),
        b.profile_url.clone(),
    ];
    let existing = existing_profile_urls(&pool, &query).await.unwrap();
    assert_eq!(existing.len(), 2);
    assert!(existing.contains(&a.profile_url));
    assert!(existing.contains(&b.profile_url));

    assert!(existing_profile_urls(&pool, &[]).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn get_creator_by_url_missing_is_not_found(pool: sqlx::PgPool) {
    let err = get_creator_by_url(&pool, "https://www.instagram.com/nobody/")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn top_creators_orders_by_followers_and_filters(pool: sqlx::PgPool) {
    upsert_creator(&pool, &make_record("small", Some(1_500))).await.unwrap();
    upsert_creator(&pool, &make_record("big", Some(90_000))).await.unwrap();
    upsert_creator(&pool, &make_record("unknown", None)).await.unwrap();

    let rows = list_top_creators(&pool, Some("instagram"), None, 10).await.unwrap();
    let handles: Vec<_> = rows.iter().filter_map(|r| r.handle.clone()).collect();
    assert_eq!(handles, vec!["big", "small", "unknown"]);

    let none = list_top_creators(&pool, Some("linkedin"), None, 10).await.unwrap();
    assert!(none.is_empty());

    let fitness = list_top_creators(&pool, None, Some("fitness"), 1).await.unwrap();
    assert_eq!(fitness.len(), 1);
}

// ---------------------------------------------------------------------------
// discovered_candidates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn discovered_candidates_are_appended(pool: sqlx::PgPool) {
    let batch = vec![
        Candidate::new(Platform::Instagram, "one").with_follower_hint(2_000),
        Candidate::new(Platform::Linkedin, "two").with_niche_hint(Niche::Business),
    ];
    assert_eq!(insert_discovered_candidates(&pool, &batch).await.unwrap(), 2);
    // Same batch again appends rather than merging.
    assert_eq!(insert_discovered_candidates(&pool, &batch).await.unwrap(), 2);
    assert_eq!(count_discovered_candidates(&pool).await.unwrap(), 4);
}

// ---------------------------------------------------------------------------
// cycle_runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cycle_runs_list_newest_first(pool: sqlx::PgPool) {
    insert_cycle_run(&pool, &make_run(1, 0)).await.unwrap();
    insert_cycle_run(&pool, &make_run(2, 60)).await.unwrap();

    let rows = list_recent_cycle_runs(&pool, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].cycle_number, 2);
    assert_eq!(rows[1].cycle_number, 1);

    let limited = list_recent_cycle_runs(&pool, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}
