//! Database operations for the `creators` table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use scout_core::ProfileRecord;
use sqlx::PgPool;

use crate::DbError;

const CREATOR_COLUMNS: &str = "id, source, profile_url, handle, display_name, bio, niche, \
     public_contact_email, location, follower_count, following_count, post_count, \
     engagement_rate, top_posts, recent_posts_sample, avatar_url, raw, scraped_at, \
     created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `creators` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CreatorRow {
    pub id: i64,
    /// `instagram` or `linkedin`; enforced by a CHECK constraint.
    pub source: String,
    pub profile_url: String,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub niche: Option<String>,
    pub public_contact_email: Option<String>,
    pub location: Option<String>,
    pub follower_count: Option<i64>,
    pub following_count: Option<i64>,
    pub post_count: Option<i64>,
    pub engagement_rate: Option<f64>,
    /// JSONB array of serialized `Post` values.
    pub top_posts: serde_json::Value,
    pub recent_posts_sample: serde_json::Value,
    pub avatar_url: Option<String>,
    pub raw: Option<serde_json::Value>,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of [`upsert_creator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertResult {
    pub id: i64,
    /// `true` when the row did not exist before this call.
    pub inserted: bool,
}

/// A `(label, count)` pair from a `GROUP BY` aggregate.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorStats {
    pub total: i64,
    pub by_source: Vec<LabelCount>,
    pub by_niche: Vec<LabelCount>,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns the subset of `profile_urls` that already have a `creators` row.
///
/// Issues a single `= ANY($1)` query regardless of input size.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn existing_profile_urls(
    pool: &PgPool,
    profile_urls: &[String],
) -> Result<HashSet<String>, DbError> {
    if profile_urls.is_empty() {
        return Ok(HashSet::new());
    }

    let rows = sqlx::query_scalar::<_, String>(
        "SELECT profile_url FROM creators WHERE profile_url = ANY($1)",
    )
    .bind(profile_urls)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Fetches a single creator by its profile URL.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] on
/// query failure.
pub async fn get_creator_by_url(pool: &PgPool, profile_url: &str) -> Result<CreatorRow, DbError> {
    let sql = format!("SELECT {CREATOR_COLUMNS} FROM creators WHERE profile_url = $1");
    sqlx::query_as::<_, CreatorRow>(&sql)
        .bind(profile_url)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Lists creators ordered by follower count, largest first.
///
/// `source` and `niche` filter when provided. Rows with an unknown follower
/// count sort last.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_top_creators(
    pool: &PgPool,
    source: Option<&str>,
    niche: Option<&str>,
    limit: i64,
) -> Result<Vec<CreatorRow>, DbError> {
    let sql = format!(
        "SELECT {CREATOR_COLUMNS} FROM creators \
         WHERE ($1::text IS NULL OR source = $1) \
           AND ($2::text IS NULL OR niche = $2) \
         ORDER BY follower_count DESC NULLS LAST, id ASC \
         LIMIT $3"
    );
    let rows = sqlx::query_as::<_, CreatorRow>(&sql)
        .bind(source)
        .bind(niche)
        .bind(limit.max(0))
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Aggregate counts: total, per source platform, and per niche.
///
/// Rows without a niche are counted under `unknown`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn creator_stats(pool: &PgPool) -> Result<CreatorStats, DbError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM creators")
        .fetch_one(pool)
        .await?;

    let by_source = sqlx::query_as::<_, LabelCount>(
        "SELECT source AS label, COUNT(*) AS count FROM creators \
         GROUP BY source ORDER BY count DESC, label ASC",
    )
    .fetch_all(pool)
    .await?;

    let by_niche = sqlx::query_as::<_, LabelCount>(
        "SELECT COALESCE(niche, 'unknown') AS label, COUNT(*) AS count FROM creators \
         GROUP BY COALESCE(niche, 'unknown') ORDER BY count DESC, label ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(CreatorStats {
        total,
        by_source,
        by_niche,
    })
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts or merges a creator keyed by `profile_url`.
///
/// On conflict, present values overwrite stored ones while `NULL` values
/// keep what is already stored. Post lists are replaced only when the new
/// list is non-empty. `scraped_at` always takes the incoming value and
/// `updated_at` never moves backwards. Applying the same record twice
/// leaves the same stored field values.
///
/// # Errors
///
/// Returns [`DbError::Encode`] if the post lists cannot be serialized, or
/// [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_creator(pool: &PgPool, record: &ProfileRecord) -> Result<UpsertResult, DbError> {
    let top_posts = serde_json::to_value(&record.top_posts).map_err(|source| DbError::Encode {
        field: "top_posts",
        source,
    })?;
    let recent_posts =
        serde_json::to_value(&record.recent_posts_sample).map_err(|source| DbError::Encode {
            field: "recent_posts_sample",
            source,
        })?;
    let niche = record.niche.map(|n| n.as_str());

    let (id, inserted): (i64, bool) = sqlx::query_as::<_, (i64, bool)>(
        "INSERT INTO creators \
             (source, profile_url, handle, display_name, bio, niche, public_contact_email, \
              location, follower_count, following_count, post_count, engagement_rate, \
              top_posts, recent_posts_sample, avatar_url, raw, scraped_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, \
                 $8, $9, $10, $11, $12, \
                 $13::jsonb, $14::jsonb, $15, $16::jsonb, $17) \
         ON CONFLICT (profile_url) DO UPDATE SET \
             source               = EXCLUDED.source, \
             handle               = COALESCE(EXCLUDED.handle, creators.handle), \
             display_name         = COALESCE(EXCLUDED.display_name, creators.display_name), \
             bio                  = COALESCE(EXCLUDED.bio, creators.bio), \
             niche                = COALESCE(EXCLUDED.niche, creators.niche), \
             public_contact_email = COALESCE(EXCLUDED.public_contact_email, creators.public_contact_email), \
             location             = COALESCE(EXCLUDED.location, creators.location), \
             follower_count       = COALESCE(EXCLUDED.follower_count, creators.follower_count), \
             following_count      = COALESCE(EXCLUDED.following_count, creators.following_count), \
             post_count           = COALESCE(EXCLUDED.post_count, creators.post_count), \
             engagement_rate      = COALESCE(EXCLUDED.engagement_rate, creators.engagement_rate), \
             top_posts            = CASE WHEN jsonb_array_length(EXCLUDED.top_posts) > 0 \
                                         THEN EXCLUDED.top_posts ELSE creators.top_posts END, \
             recent_posts_sample  = CASE WHEN jsonb_array_length(EXCLUDED.recent_posts_sample) > 0 \
                                         THEN EXCLUDED.recent_posts_sample ELSE creators.recent_posts_sample END, \
             avatar_url           = COALESCE(EXCLUDED.avatar_url, creators.avatar_url), \
             raw                  = COALESCE(EXCLUDED.raw, creators.raw), \
             scraped_at           = EXCLUDED.scraped_at, \
             updated_at           = GREATEST(creators.updated_at, NOW()) \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(record.source.as_str())
    .bind(&record.profile_url)
    .bind(&record.handle)
    .bind(&record.display_name)
    .bind(&record.bio)
    .bind(niche)
    .bind(&record.public_contact_email)
    .bind(&record.location)
    .bind(record.follower_count)
    .bind(record.following_count)
    .bind(record.post_count)
    .bind(record.engagement_rate)
    .bind(top_posts)
    .bind(recent_posts)
    .bind(&record.avatar_url)
    .bind(&record.raw)
    .bind(record.scraped_at)
    .fetch_one(pool)
    .await?;

    Ok(UpsertResult { id, inserted })
}
