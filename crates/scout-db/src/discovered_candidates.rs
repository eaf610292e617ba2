//! Append-only audit log of discovered candidates.

use scout_core::Candidate;
use sqlx::PgPool;

use crate::DbError;

/// Appends every candidate in `candidates` to `discovered_candidates`.
///
/// Rows are written in one transaction so a cycle's audit batch lands
/// entirely or not at all. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert or the commit fails.
pub async fn insert_discovered_candidates(
    pool: &PgPool,
    candidates: &[Candidate],
) -> Result<u64, DbError> {
    if candidates.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0_u64;

    for candidate in candidates {
        let result = sqlx::query(
            "INSERT INTO discovered_candidates \
                 (platform, handle, profile_url, follower_hint, niche_hint, discovered_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(candidate.platform.as_str())
        .bind(&candidate.handle)
        .bind(&candidate.profile_url)
        .bind(candidate.follower_hint)
        .bind(candidate.niche_hint.map(|n| n.as_str()))
        .bind(candidate.discovered_at)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

/// Total number of audit rows recorded so far.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_discovered_candidates(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM discovered_candidates")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
