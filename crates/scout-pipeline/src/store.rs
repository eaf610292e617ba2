//! Postgres-backed [`CreatorStore`].

use std::collections::HashSet;

use async_trait::async_trait;
use scout_core::{Candidate, ProfileRecord};
use sqlx::PgPool;

use crate::error::StoreError;
use crate::traits::{CreatorStore, UpsertStatus};
use crate::types::CycleStats;

#[derive(Debug, Clone)]
pub struct PgCreatorStore {
    pool: PgPool,
}

impl PgCreatorStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CreatorStore for PgCreatorStore {
    async fn existing_keys(&self, profile_urls: &[String]) -> Result<HashSet<String>, StoreError> {
        Ok(scout_db::existing_profile_urls(&self.pool, profile_urls).await?)
    }

    async fn upsert(&self, record: &ProfileRecord) -> Result<UpsertStatus, StoreError> {
        let result = scout_db::upsert_creator(&self.pool, record).await?;
        Ok(if result.inserted {
            UpsertStatus::Inserted
        } else {
            UpsertStatus::Updated
        })
    }

    async fn record_discovered(&self, candidates: &[Candidate]) -> Result<(), StoreError> {
        scout_db::insert_discovered_candidates(&self.pool, candidates).await?;
        Ok(())
    }

    async fn record_cycle(&self, stats: &CycleStats) -> Result<(), StoreError> {
        scout_db::insert_cycle_run(&self.pool, &to_cycle_run(stats)).await?;
        Ok(())
    }
}

fn clamp_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Maps in-memory statistics onto a `cycle_runs` row.
#[must_use]
pub fn to_cycle_run(stats: &CycleStats) -> scout_db::NewCycleRun {
    let degradations = serde_json::Value::Array(
        stats
            .degradations
            .iter()
            .map(|d| serde_json::json!({ "detail": d.to_string(), "info": d }))
            .collect(),
    );
    scout_db::NewCycleRun {
        public_id: stats.public_id,
        cycle_number: i64::try_from(stats.cycle).unwrap_or(i64::MAX),
        started_at: stats.started_at,
        duration_ms: i64::try_from(stats.duration.as_millis()).unwrap_or(i64::MAX),
        discovered: clamp_i32(stats.discovered),
        filtered_out: clamp_i32(stats.filtered_out),
        deduped_out: clamp_i32(stats.deduped_out),
        blocked: clamp_i32(stats.blocked),
        fetch_attempts: clamp_i32(stats.fetch_attempts),
        successes: clamp_i32(stats.successes),
        soft_failures: clamp_i32(stats.soft_failures),
        hard_failures: clamp_i32(stats.hard_failures),
        records_inserted: clamp_i32(stats.inserted),
        records_updated: clamp_i32(stats.updated),
        records_rejected: clamp_i32(stats.rejected),
        degradations,
    }
}
