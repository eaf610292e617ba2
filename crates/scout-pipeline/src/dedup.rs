use std::sync::Arc;

use scout_core::Candidate;

use crate::traits::CreatorStore;
use crate::types::Degradation;

/// Result of filtering a batch against the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    /// Candidates with no persisted row, in input order.
    pub unseen: Vec<Candidate>,
    pub deduped_out: usize,
    /// Set when the lookup failed and the batch passed through unfiltered.
    pub degradation: Option<Degradation>,
}

/// Drops candidates whose profile URL is already persisted.
#[derive(Clone)]
pub struct Deduplicator {
    store: Arc<dyn CreatorStore>,
}

impl Deduplicator {
    #[must_use]
    pub fn new(store: Arc<dyn CreatorStore>) -> Self {
        Self { store }
    }

    /// One batched existence lookup for the whole slice.
    ///
    /// A store failure is not fatal: the batch is returned unchanged with a
    /// [`Degradation::DedupUnavailable`], since upserts are idempotent.
    pub async fn filter_unseen(&self, candidates: Vec<Candidate>) -> DedupOutcome {
        if candidates.is_empty() {
            return DedupOutcome {
                unseen: candidates,
                deduped_out: 0,
                degradation: None,
            };
        }

        let keys: Vec<String> = candidates.iter().map(|c| c.profile_url.clone()).collect();
        match self.store.existing_keys(&keys).await {
            Ok(existing) => {
                let before = candidates.len();
                let unseen: Vec<Candidate> = candidates
                    .into_iter()
                    .filter(|c| !existing.contains(&c.profile_url))
                    .collect();
                let deduped_out = before - unseen.len();
                tracing::debug!(before, deduped_out, "dedup filtered candidates");
                DedupOutcome {
                    unseen,
                    deduped_out,
                    degradation: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, count = candidates.len(), "dedup lookup failed; passing candidates through");
                DedupOutcome {
                    unseen: candidates,
                    deduped_out: 0,
                    degradation: Some(Degradation::DedupUnavailable {
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }
}
