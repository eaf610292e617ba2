//! Outcome and statistics types exchanged between pipeline stages.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use scout_core::{Candidate, Platform, ProfileRecord};
use serde::Serialize;
use uuid::Uuid;

/// Reason attached to candidates whose fetch was abandoned by shutdown.
pub const SHUTDOWN_REASON: &str = "shutdown";

/// Final result of fetching one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Box<ProfileRecord>),
    /// Retryable in principle, but no further attempt is made this cycle.
    SoftFail { reason: String },
    /// Not retryable, or retries exhausted.
    HardFail { reason: String },
}

impl FetchOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchOutcome::SoftFail { .. })
    }

    /// Whether this outcome should count toward the repeated-failure ledger.
    /// Shutdown aborts are not the candidate's fault.
    #[must_use]
    pub fn counts_against_candidate(&self) -> bool {
        match self {
            FetchOutcome::Success(_) => false,
            FetchOutcome::SoftFail { reason } => reason != SHUTDOWN_REASON,
            FetchOutcome::HardFail { .. } => true,
        }
    }
}

/// One emitted scheduler result: exactly one per input candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub candidate: Candidate,
    /// Collaborator calls made for this candidate.
    pub attempts: u32,
    pub outcome: FetchOutcome,
}

/// What reconciliation did with one fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    Updated,
    /// The fetched record failed validation and was not written.
    Rejected(String),
    StoreFailed(String),
    /// Soft or hard fetch failure; no store mutation.
    Skipped,
}

/// A stage that underperformed without failing the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// The existence lookup failed; candidates were passed through unfiltered.
    DedupUnavailable { reason: String },
    /// Browsing a platform stopped early after exhausting retries.
    DiscoveryIncomplete { platform: Platform, reason: String },
    /// The browse time budget ran out before the candidate cap was reached.
    DiscoveryTimedOut { collected: usize },
    /// Every configured platform failed; nothing was discovered.
    DiscoveryUnavailable,
    AuditWriteFailed { reason: String },
    StoreFailures { count: usize },
    /// Shutdown stopped pending permit waits or retries mid-cycle.
    Interrupted { abandoned: usize },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::DedupUnavailable { reason } => {
                write!(f, "dedup lookup failed, candidates not filtered: {reason}")
            }
            Degradation::DiscoveryIncomplete { platform, reason } => {
                write!(f, "{platform} discovery stopped early: {reason}")
            }
            Degradation::DiscoveryTimedOut { collected } => {
                write!(f, "browse time budget exhausted after {collected} candidates")
            }
            Degradation::DiscoveryUnavailable => write!(f, "all discovery sources failed"),
            Degradation::AuditWriteFailed { reason } => {
                write!(f, "discovered-candidates audit write failed: {reason}")
            }
            Degradation::StoreFailures { count } => write!(f, "{count} upserts failed"),
            Degradation::Interrupted { abandoned } => {
                write!(f, "shutdown abandoned {abandoned} pending fetches")
            }
        }
    }
}

/// Statistics for one completed cycle. Never mutated after the cycle ends.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    pub cycle: u64,
    pub public_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub discovered: usize,
    pub filtered_out: usize,
    pub deduped_out: usize,
    pub blocked: usize,
    pub fetch_attempts: usize,
    pub successes: usize,
    /// Soft-failed attempts, including ones later resolved by a retry.
    pub soft_failures: usize,
    /// Candidates whose final outcome was a hard failure.
    pub hard_failures: usize,
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
    pub store_failures: usize,
    pub degradations: Vec<Degradation>,
    pub duration: Duration,
}

impl CycleStats {
    /// An all-zero record for a cycle that is just starting.
    #[must_use]
    pub fn new(cycle: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            cycle,
            public_id: Uuid::new_v4(),
            started_at,
            discovered: 0,
            filtered_out: 0,
            deduped_out: 0,
            blocked: 0,
            fetch_attempts: 0,
            successes: 0,
            soft_failures: 0,
            hard_failures: 0,
            inserted: 0,
            updated: 0,
            rejected: 0,
            store_failures: 0,
            degradations: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}
