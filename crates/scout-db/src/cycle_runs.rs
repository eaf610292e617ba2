//! Database operations for `cycle_runs`, the persisted cycle statistics history.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `cycle_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CycleRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub cycle_number: i64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub discovered: i32,
    pub filtered_out: i32,
    pub deduped_out: i32,
    pub blocked: i32,
    pub fetch_attempts: i32,
    pub successes: i32,
    pub soft_failures: i32,
    pub hard_failures: i32,
    pub records_inserted: i32,
    pub records_updated: i32,
    pub records_rejected: i32,
    /// JSONB array of degradation descriptions.
    pub degradations: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Values for a new `cycle_runs` row. Counters are clamped into `INTEGER`
/// range by the caller.
#[derive(Debug, Clone)]
pub struct NewCycleRun {
    pub public_id: Uuid,
    pub cycle_number: i64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub discovered: i32,
    pub filtered_out: i32,
    pub deduped_out: i32,
    pub blocked: i32,
    pub fetch_attempts: i32,
    pub successes: i32,
    pub soft_failures: i32,
    pub hard_failures: i32,
    pub records_inserted: i32,
    pub records_updated: i32,
    pub records_rejected: i32,
    pub degradations: serde_json::Value,
}

// ---------------------------------------------------------------------------
// cycle_runs operations
// ---------------------------------------------------------------------------

/// Inserts a completed cycle. Rows are never updated afterwards.
///
/// Returns the internal `id` of the new row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate
/// `public_id`).
pub async fn insert_cycle_run(pool: &PgPool, run: &NewCycleRun) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO cycle_runs \
             (public_id, cycle_number, started_at, duration_ms, discovered, filtered_out, \
              deduped_out, blocked, fetch_attempts, successes, soft_failures, hard_failures, \
              records_inserted, records_updated, records_rejected, degradations) \
         VALUES ($1, $2, $3, $4, $5, $6, \
                 $7, $8, $9, $10, $11, $12, \
                 $13, $14, $15, $16::jsonb) \
         RETURNING id",
    )
    .bind(run.public_id)
    .bind(run.cycle_number)
    .bind(run.started_at)
    .bind(run.duration_ms)
    .bind(run.discovered)
    .bind(run.filtered_out)
    .bind(run.deduped_out)
    .bind(run.blocked)
    .bind(run.fetch_attempts)
    .bind(run.successes)
    .bind(run.soft_failures)
    .bind(run.hard_failures)
    .bind(run.records_inserted)
    .bind(run.records_updated)
    .bind(run.records_rejected)
    .bind(&run.degradations)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns the most recent cycles, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_cycle_runs(pool: &PgPool, limit: i64) -> Result<Vec<CycleRunRow>, DbError> {
    let rows = sqlx::query_as::<_, CycleRunRow>(
        "SELECT id, public_id, cycle_number, started_at, duration_ms, discovered, filtered_out, \
                deduped_out, blocked, fetch_attempts, successes, soft_failures, hard_failures, \
                records_inserted, records_updated, records_rejected, degradations, created_at \
         FROM cycle_runs \
         ORDER BY started_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
