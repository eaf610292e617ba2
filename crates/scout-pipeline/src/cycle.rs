//! The repeating discovery → fetch → reconcile loop.
//!
//! The controller owns all cross-cycle state: the shared rate limiter, the
//! stats history, running totals and the repeated-failure ledger. A cycle
//! never fails; every problem is folded into its [`CycleStats`]. Shutdown is
//! honored at the sleep boundary and interrupts pending permit waits.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use scout_core::{validate_discovery, AppConfig, Candidate, DiscoveryConfig};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffPolicy;
use crate::dedup::Deduplicator;
use crate::discovery::{DiscoverySettings, DiscoveryStage};
use crate::error::PipelineError;
use crate::fetch::{FetchScheduler, FetchSettings};
use crate::niche::NicheClassifier;
use crate::rate_limit::RateLimiter;
use crate::reconcile::Reconciler;
use crate::traits::{BrowseSource, CreatorStore, ProfileFetcher};
use crate::types::{CycleStats, Degradation, RecordOutcome};

/// Where the controller is within a cycle.
///
/// Reconciliation consumes fetch results as they arrive, so it overlaps
/// `Fetching`. `Reconciling` covers the drain after the last fetch result
/// has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Scheduled,
    Discovering,
    Fetching,
    Reconciling,
    Sleeping,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub interval: Duration,
    pub fetch: FetchSettings,
    pub reconcile_concurrency: usize,
    /// Skip candidates after this many consecutive failed cycles.
    pub block_after_failed_cycles: Option<u32>,
    /// Number of [`CycleStats`] kept in memory.
    pub history_limit: usize,
}

impl CycleSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.cycle_interval_secs),
            fetch: FetchSettings {
                concurrency: config.fetch_concurrency,
                max_attempts: config.fetch_max_attempts,
                backoff: BackoffPolicy::from_millis(
                    config.retry_backoff_base_ms,
                    config.retry_backoff_ceiling_ms,
                ),
            },
            reconcile_concurrency: config.reconcile_concurrency,
            block_after_failed_cycles: config.block_after_failed_cycles,
            history_limit: config.history_limit,
        }
    }
}

/// External systems the controller drives.
#[derive(Clone)]
pub struct Collaborators {
    pub browse: Arc<dyn BrowseSource>,
    pub fetcher: Arc<dyn ProfileFetcher>,
    pub store: Arc<dyn CreatorStore>,
}

/// Running totals across every cycle since start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTotals {
    pub cycles: u64,
    pub discovered: usize,
    pub fetch_attempts: usize,
    pub successes: usize,
    pub hard_failures: usize,
    pub inserted: usize,
    pub updated: usize,
    pub degraded_cycles: u64,
}

impl CycleTotals {
    fn add(&mut self, stats: &CycleStats) {
        self.cycles += 1;
        self.discovered += stats.discovered;
        self.fetch_attempts += stats.fetch_attempts;
        self.successes += stats.successes;
        self.hard_failures += stats.hard_failures;
        self.inserted += stats.inserted;
        self.updated += stats.updated;
        if stats.is_degraded() {
            self.degraded_cycles += 1;
        }
    }
}

pub struct CycleController {
    discovery: DiscoveryStage,
    scheduler: FetchScheduler,
    reconciler: Reconciler,
    store: Arc<dyn CreatorStore>,
    limiter: Arc<RateLimiter>,
    settings: CycleSettings,
    shutdown: CancellationToken,
    phase: CyclePhase,
    cycles_started: u64,
    history: VecDeque<CycleStats>,
    totals: CycleTotals,
    /// Consecutive failed cycles per profile URL.
    failures: HashMap<String, u32>,
}

impl CycleController {
    /// Wires the stages together around one shared rate limiter.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if the discovery config is
    /// invalid or any rate budget can never grant a permit.
    pub fn new(
        collaborators: Collaborators,
        discovery_config: &DiscoveryConfig,
        settings: CycleSettings,
        shutdown: CancellationToken,
    ) -> Result<Self, PipelineError> {
        validate_discovery(discovery_config)?;
        let limiter = Arc::new(
            RateLimiter::from_discovery(discovery_config)?.with_shutdown(shutdown.clone()),
        );

        let Collaborators {
            browse,
            fetcher,
            store,
        } = collaborators;

        let discovery = DiscoveryStage::new(
            browse,
            Arc::clone(&limiter),
            Deduplicator::new(Arc::clone(&store)),
            DiscoverySettings::from_config(discovery_config),
            settings.fetch.backoff,
        );
        let scheduler = FetchScheduler::new(
            fetcher,
            Arc::clone(&limiter),
            settings.fetch,
            shutdown.clone(),
        );
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            NicheClassifier::new(),
            settings.reconcile_concurrency,
        );

        Ok(Self {
            discovery,
            scheduler,
            reconciler,
            store,
            limiter,
            settings,
            shutdown,
            phase: CyclePhase::Scheduled,
            cycles_started: 0,
            history: VecDeque::new(),
            totals: CycleTotals::default(),
            failures: HashMap::new(),
        })
    }

    #[must_use]
    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Most recent cycles, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CycleStats> {
        self.history.iter()
    }

    #[must_use]
    pub fn last_stats(&self) -> Option<&CycleStats> {
        self.history.back()
    }

    #[must_use]
    pub fn totals(&self) -> CycleTotals {
        self.totals
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Consecutive failed cycles recorded for `profile_url`.
    #[must_use]
    pub fn failure_count(&self, profile_url: &str) -> u32 {
        self.failures.get(profile_url).copied().unwrap_or(0)
    }

    /// Runs cycles until shutdown is requested, sleeping `interval` between
    /// them. Returns the number of cycles completed.
    pub async fn run_forever(&mut self) -> u64 {
        let mut completed = 0_u64;
        tracing::info!(
            interval_secs = self.settings.interval.as_secs(),
            "cycle controller started"
        );

        while !self.shutdown.is_cancelled() {
            self.phase = CyclePhase::Scheduled;
            self.run_cycle().await;
            completed += 1;

            self.phase = CyclePhase::Sleeping;
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        tracing::info!(cycles = completed, "cycle controller stopped");
        completed
    }

    /// Runs one full cycle and returns its statistics.
    pub async fn run_cycle(&mut self) -> CycleStats {
        self.cycles_started += 1;
        let started = Instant::now();
        let mut stats = CycleStats::new(self.cycles_started, Utc::now());
        tracing::info!(cycle = stats.cycle, public_id = %stats.public_id, "cycle starting");

        self.phase = CyclePhase::Discovering;
        let report = self.discovery.run().await;
        stats.discovered = report.discovered.len();
        stats.filtered_out = report.filtered_out;
        stats.deduped_out = report.deduped_out;
        stats.degradations.extend(report.degradations);

        if !report.discovered.is_empty() {
            if let Err(e) = self.store.record_discovered(&report.discovered).await {
                tracing::warn!(cycle = stats.cycle, error = %e, "failed to record discovered candidates");
                stats.degradations.push(Degradation::AuditWriteFailed {
                    reason: e.to_string(),
                });
            }
        }

        let candidates = self.drop_blocked(report.accepted, &mut stats);

        self.phase = CyclePhase::Fetching;
        let capacity = self.settings.fetch.concurrency.max(1) * 2;
        let (tx, rx) = mpsc::channel(capacity);
        let phase = &mut self.phase;
        let scheduler = &self.scheduler;
        let fetching = async {
            let tally = scheduler.run(candidates, tx).await;
            *phase = CyclePhase::Reconciling;
            tally
        };
        let (tally, reconciled) = tokio::join!(fetching, self.reconciler.run(rx));

        stats.fetch_attempts = tally.attempts;
        stats.successes = tally.successes;
        stats.soft_failures = tally.soft_failures;
        stats.hard_failures = tally.hard_failures;
        stats.inserted = reconciled.inserted;
        stats.updated = reconciled.updated;
        stats.rejected = reconciled.rejected;
        stats.store_failures = reconciled.store_failures;
        if reconciled.store_failures > 0 {
            stats.degradations.push(Degradation::StoreFailures {
                count: reconciled.store_failures,
            });
        }
        if tally.abandoned > 0 {
            stats.degradations.push(Degradation::Interrupted {
                abandoned: tally.abandoned,
            });
        }

        for entry in &reconciled.entries {
            match entry.outcome {
                RecordOutcome::Inserted | RecordOutcome::Updated => {
                    self.failures.remove(&entry.profile_url);
                }
                _ if entry.counts_as_failure => {
                    *self.failures.entry(entry.profile_url.clone()).or_default() += 1;
                }
                _ => {}
            }
        }

        stats.duration = started.elapsed();
        self.finish(&stats).await;
        stats
    }

    fn drop_blocked(&self, candidates: Vec<Candidate>, stats: &mut CycleStats) -> Vec<Candidate> {
        let Some(threshold) = self.settings.block_after_failed_cycles else {
            return candidates;
        };
        let threshold = threshold.max(1);
        let before = candidates.len();
        let kept: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| self.failure_count(&c.profile_url) < threshold)
            .collect();
        stats.blocked = before - kept.len();
        if stats.blocked > 0 {
            tracing::info!(
                cycle = stats.cycle,
                blocked = stats.blocked,
                threshold,
                "skipping repeatedly failing candidates"
            );
        }
        kept
    }

    async fn finish(&mut self, stats: &CycleStats) {
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = stats.duration.as_millis() as u64;
        tracing::info!(
            cycle = stats.cycle,
            discovered = stats.discovered,
            filtered_out = stats.filtered_out,
            deduped_out = stats.deduped_out,
            blocked = stats.blocked,
            fetch_attempts = stats.fetch_attempts,
            successes = stats.successes,
            soft_failures = stats.soft_failures,
            hard_failures = stats.hard_failures,
            inserted = stats.inserted,
            updated = stats.updated,
            rejected = stats.rejected,
            duration_ms,
            degraded = stats.is_degraded(),
            "cycle complete"
        );
        for degradation in &stats.degradations {
            tracing::warn!(cycle = stats.cycle, %degradation, "cycle degraded");
        }

        if let Err(e) = self.store.record_cycle(stats).await {
            tracing::warn!(cycle = stats.cycle, error = %e, "failed to persist cycle stats");
        }

        self.history.push_back(stats.clone());
        while self.history.len() > self.settings.history_limit.max(1) {
            self.history.pop_front();
        }
        self.totals.add(stats);
    }
}
