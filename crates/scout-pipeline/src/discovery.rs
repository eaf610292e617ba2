//! Per-cycle discovery: browse, filter, dedup.
//!
//! Browsing is bounded by a wall-clock budget and a candidate cap, whichever
//! comes first. Every collaborator call, including its rate-limit wait and
//! retry backoff, runs under the same deadline.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use scout_core::{Candidate, DiscoveryConfig, Niche, Platform};
use tokio::time::Instant;

use crate::backoff::BackoffPolicy;
use crate::dedup::Deduplicator;
use crate::error::RateLimitError;
use crate::rate_limit::RateLimiter;
use crate::traits::{BrowseBatch, BrowseSession, BrowseSource};
use crate::types::Degradation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    Idle,
    Browsing,
    Filtering,
    Done,
}

/// Browse limits and filters taken from the discovery file.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverySettings {
    pub platforms: Vec<Platform>,
    pub max_candidates: usize,
    pub time_budget: Duration,
    pub max_retries: u32,
    pub min_followers: i64,
    pub max_followers: i64,
    /// Empty accepts every niche hint.
    pub niches: Vec<Niche>,
}

impl DiscoverySettings {
    #[must_use]
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            platforms: config.platforms.clone(),
            max_candidates: config.max_candidates_per_cycle,
            time_budget: Duration::from_secs(config.browse_time_budget_secs),
            max_retries: config.browse_max_retries,
            min_followers: config.min_followers,
            max_followers: config.max_followers,
            niches: config.niches.clone(),
        }
    }

    /// Inclusive follower bounds and the niche allow-list. Missing hints pass.
    #[must_use]
    pub fn accepts(&self, candidate: &Candidate) -> bool {
        let followers_ok = candidate
            .follower_hint
            .is_none_or(|f| f >= self.min_followers && f <= self.max_followers);
        let niche_ok = self.niches.is_empty()
            || candidate
                .niche_hint
                .is_none_or(|n| self.niches.contains(&n));
        followers_ok && niche_ok
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    /// Every raw candidate browsed this cycle, for the audit log.
    pub discovered: Vec<Candidate>,
    /// Candidates that passed filtering and dedup.
    pub accepted: Vec<Candidate>,
    pub filtered_out: usize,
    pub deduped_out: usize,
    pub degradations: Vec<Degradation>,
}

enum BrowseStep {
    Batch(BrowseBatch),
    Failed(String),
    Cancelled,
}

pub struct DiscoveryStage {
    source: Arc<dyn BrowseSource>,
    limiter: Arc<RateLimiter>,
    dedup: Deduplicator,
    settings: DiscoverySettings,
    backoff: BackoffPolicy,
    phase: DiscoveryPhase,
}

impl DiscoveryStage {
    #[must_use]
    pub fn new(
        source: Arc<dyn BrowseSource>,
        limiter: Arc<RateLimiter>,
        dedup: Deduplicator,
        settings: DiscoverySettings,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            source,
            limiter,
            dedup,
            settings,
            backoff,
            phase: DiscoveryPhase::Idle,
        }
    }

    #[must_use]
    pub fn phase(&self) -> DiscoveryPhase {
        self.phase
    }

    #[must_use]
    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Runs one discovery pass. Never fails; problems become degradations.
    pub async fn run(&mut self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        self.phase = DiscoveryPhase::Browsing;
        report.discovered = self.browse(&mut report.degradations).await;

        self.phase = DiscoveryPhase::Filtering;
        let (kept, rejected): (Vec<Candidate>, Vec<Candidate>) = report
            .discovered
            .iter()
            .cloned()
            .partition(|c| self.settings.accepts(c));
        report.filtered_out = rejected.len();

        let dedup = self.dedup.filter_unseen(kept).await;
        report.accepted = dedup.unseen;
        report.deduped_out = dedup.deduped_out;
        report.degradations.extend(dedup.degradation);

        self.phase = DiscoveryPhase::Done;
        tracing::info!(
            discovered = report.discovered.len(),
            filtered_out = report.filtered_out,
            deduped_out = report.deduped_out,
            accepted = report.accepted.len(),
            "discovery complete"
        );
        report
    }

    async fn browse(&self, degradations: &mut Vec<Degradation>) -> Vec<Candidate> {
        let deadline = Instant::now() + self.settings.time_budget;
        let cap = self.settings.max_candidates;
        let mut collected: Vec<Candidate> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut failed_platforms = 0_usize;

        'platforms: for &platform in &self.settings.platforms {
            let mut session = BrowseSession::new(platform);
            let key = format!("{platform}_browse");

            while collected.len() < cap && !session.exhausted {
                if Instant::now() >= deadline {
                    self.record_timeout(collected.len(), degradations);
                    break 'platforms;
                }
                let step = tokio::time::timeout_at(deadline, self.next_batch(&mut session, &key));
                let Ok(step) = step.await else {
                    self.record_timeout(collected.len(), degradations);
                    break 'platforms;
                };

                match step {
                    // An empty page is not the end of the feed; only the
                    // source, the cap or the deadline stop a platform.
                    BrowseStep::Batch(BrowseBatch::Candidates(batch)) => {
                        for candidate in batch {
                            if collected.len() >= cap {
                                break;
                            }
                            if seen.insert(candidate.profile_url.clone()) {
                                collected.push(candidate);
                            }
                        }
                    }
                    BrowseStep::Batch(BrowseBatch::EndOfFeed) => break,
                    BrowseStep::Failed(reason) => {
                        tracing::warn!(%platform, %reason, "browsing stopped early");
                        if session.batches_fetched == 0 {
                            failed_platforms += 1;
                        }
                        degradations.push(Degradation::DiscoveryIncomplete { platform, reason });
                        break;
                    }
                    BrowseStep::Cancelled => {
                        tracing::info!(%platform, "browsing interrupted by shutdown");
                        break 'platforms;
                    }
                }
            }
        }

        if failed_platforms > 0 && failed_platforms == self.settings.platforms.len() {
            tracing::error!("every discovery source failed this cycle");
            degradations.push(Degradation::DiscoveryUnavailable);
        }

        collected
    }

    fn record_timeout(&self, collected: usize, degradations: &mut Vec<Degradation>) {
        tracing::warn!(
            collected,
            budget_secs = self.settings.time_budget.as_secs(),
            "browse time budget exhausted"
        );
        degradations.push(Degradation::DiscoveryTimedOut { collected });
    }

    /// One batch, retrying transient errors with backoff.
    async fn next_batch(&self, session: &mut BrowseSession, key: &str) -> BrowseStep {
        let mut failures = 0_u32;
        loop {
            match self.limiter.acquire(key).await {
                Ok(()) => {}
                Err(RateLimitError::Cancelled { .. }) => return BrowseStep::Cancelled,
                Err(e @ RateLimitError::ZeroBudget { .. }) => return BrowseStep::Failed(e.to_string()),
            }

            match self.source.next_batch(session).await {
                Ok(batch) => {
                    session.batches_fetched += 1;
                    if matches!(batch, BrowseBatch::EndOfFeed) {
                        session.exhausted = true;
                    }
                    return BrowseStep::Batch(batch);
                }
                Err(e) if e.is_transient() && failures < self.settings.max_retries => {
                    failures += 1;
                    let delay = self.backoff.delay(failures);
                    #[allow(clippy::cast_possible_truncation)]
                    let delay_ms = delay.as_millis() as u64;
                    tracing::warn!(
                        platform = %session.platform,
                        attempt = failures,
                        delay_ms,
                        error = %e,
                        "transient browse error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return BrowseStep::Failed(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
