// Collaborator seams for the pipeline.
//
// BrowseSource and ProfileFetcher wrap the extraction service; CreatorStore
// wraps Postgres. Tests swap in scripted fakes and the in-memory store.

use std::collections::HashSet;

use async_trait::async_trait;
use scout_core::{Candidate, Platform, ProfileRecord};

use crate::error::{SourceError, StoreError};
use crate::types::CycleStats;

// ---------------------------------------------------------------------------
// Browsing
// ---------------------------------------------------------------------------

/// Per-platform browsing state carried across `next_batch` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseSession {
    pub platform: Platform,
    /// Opaque continuation token owned by the source.
    pub cursor: Option<String>,
    /// Set by the source once the feed has no further pages.
    pub exhausted: bool,
    pub batches_fetched: u32,
}

impl BrowseSession {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            cursor: None,
            exhausted: false,
            batches_fetched: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrowseBatch {
    Candidates(Vec<Candidate>),
    EndOfFeed,
}

#[async_trait]
pub trait BrowseSource: Send + Sync {
    /// Next batch of raw candidates for `session.platform`.
    async fn next_batch(&self, session: &mut BrowseSession) -> Result<BrowseBatch, SourceError>;
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// One attempt at fetching the detailed profile. Retries are the
    /// scheduler's job, not the fetcher's.
    async fn fetch_profile(&self, candidate: &Candidate) -> Result<ProfileRecord, SourceError>;
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStatus {
    Inserted,
    Updated,
}

#[async_trait]
pub trait CreatorStore: Send + Sync {
    /// Subset of `profile_urls` already persisted, in one round trip.
    async fn existing_keys(&self, profile_urls: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Insert-or-merge keyed by `record.profile_url`. Must be atomic per key.
    async fn upsert(&self, record: &ProfileRecord) -> Result<UpsertStatus, StoreError>;

    /// Append discovered candidates to the audit log.
    async fn record_discovered(&self, candidates: &[Candidate]) -> Result<(), StoreError>;

    /// Persist a finished cycle's statistics.
    async fn record_cycle(&self, stats: &CycleStats) -> Result<(), StoreError>;
}
