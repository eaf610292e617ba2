//! Bounded-concurrency profile fetching with per-candidate retry.
//!
//! At most `concurrency` attempts are in flight; each one first takes a
//! `{platform}_fetch` permit. Transient failures are re-queued after an
//! exponential backoff until `max_attempts` is reached. A candidate key is
//! owned by at most one job at a time, so the same profile is never fetched
//! twice concurrently even when it appears twice in the batch.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use scout_core::{Candidate, ProfileRecord};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffPolicy;
use crate::error::RateLimitError;
use crate::rate_limit::RateLimiter;
use crate::traits::ProfileFetcher;
use crate::types::{FetchOutcome, FetchResult, SHUTDOWN_REASON};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub concurrency: usize,
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
}

/// Counters for one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchTally {
    /// Collaborator calls made.
    pub attempts: usize,
    pub successes: usize,
    /// Attempts that failed transiently, whether or not a retry succeeded.
    pub soft_failures: usize,
    /// Candidates whose final outcome is a hard failure.
    pub hard_failures: usize,
    /// Candidates given up on because of shutdown: a cancelled permit wait,
    /// or a transient failure that would otherwise have been retried.
    pub abandoned: usize,
}

#[derive(Debug)]
struct Job {
    candidate: Candidate,
    attempts: u32,
}

enum Step {
    Fetched(Box<ProfileRecord>),
    Transient(String),
    Permanent(String),
    /// The permit can never be granted; no call was made.
    Refused(String),
    Cancelled,
}

/// Ownership of candidate keys across queued, delayed and in-flight jobs.
#[derive(Debug, Default)]
struct Claims {
    claimed: HashSet<String>,
    parked: HashMap<String, VecDeque<Job>>,
}

impl Claims {
    /// Returns the job if its key was free, otherwise parks it.
    fn admit(&mut self, job: Job) -> Option<Job> {
        if self.claimed.insert(job.candidate.profile_url.clone()) {
            Some(job)
        } else {
            self.parked
                .entry(job.candidate.profile_url.clone())
                .or_default()
                .push_back(job);
            None
        }
    }

    /// Frees `key` or hands it to the next parked job for the same key.
    fn release(&mut self, key: &str) -> Option<Job> {
        if let Some(queue) = self.parked.get_mut(key) {
            if let Some(next) = queue.pop_front() {
                if queue.is_empty() {
                    self.parked.remove(key);
                }
                return Some(next);
            }
        }
        self.claimed.remove(key);
        None
    }
}

pub struct FetchScheduler {
    fetcher: Arc<dyn ProfileFetcher>,
    limiter: Arc<RateLimiter>,
    settings: FetchSettings,
    shutdown: CancellationToken,
}

impl FetchScheduler {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn ProfileFetcher>,
        limiter: Arc<RateLimiter>,
        settings: FetchSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            limiter,
            settings,
            shutdown,
        }
    }

    /// Fetches every candidate and sends exactly one [`FetchResult`] per
    /// input on `tx`, in completion order. Returns once all are sent.
    pub async fn run(&self, candidates: Vec<Candidate>, tx: mpsc::Sender<FetchResult>) -> FetchTally {
        let concurrency = self.settings.concurrency.max(1);
        let max_attempts = self.settings.max_attempts.max(1);
        let mut tally = FetchTally::default();
        let mut claims = Claims::default();
        let mut ready: VecDeque<Job> = candidates
            .into_iter()
            .filter_map(|candidate| {
                claims.admit(Job {
                    candidate,
                    attempts: 0,
                })
            })
            .collect();

        let mut in_flight = FuturesUnordered::new();
        let mut delayed = FuturesUnordered::new();

        loop {
            while in_flight.len() < concurrency {
                let Some(job) = ready.pop_front() else { break };
                in_flight.push(self.attempt(job));
            }
            if in_flight.is_empty() && delayed.is_empty() {
                break;
            }

            tokio::select! {
                Some((job, step)) = in_flight.next(), if !in_flight.is_empty() => {
                    let outcome = match step {
                        Step::Fetched(record) => {
                            tally.attempts += 1;
                            tally.successes += 1;
                            FetchOutcome::Success(record)
                        }
                        Step::Permanent(reason) => {
                            tally.attempts += 1;
                            tally.hard_failures += 1;
                            tracing::warn!(profile_url = %job.candidate.profile_url, attempt = job.attempts, %reason, "fetch failed permanently");
                            FetchOutcome::HardFail { reason }
                        }
                        Step::Transient(reason) => {
                            tally.attempts += 1;
                            tally.soft_failures += 1;
                            if job.attempts >= max_attempts {
                                tally.hard_failures += 1;
                                tracing::warn!(profile_url = %job.candidate.profile_url, attempts = job.attempts, %reason, "fetch retries exhausted");
                                FetchOutcome::HardFail {
                                    reason: format!("gave up after {} attempts: {reason}", job.attempts),
                                }
                            } else if self.shutdown.is_cancelled() {
                                tally.abandoned += 1;
                                tracing::debug!(profile_url = %job.candidate.profile_url, attempt = job.attempts, %reason, "transient fetch error during shutdown, not retrying");
                                FetchOutcome::SoftFail {
                                    reason: SHUTDOWN_REASON.to_string(),
                                }
                            } else {
                                let delay = self.settings.backoff.delay(job.attempts);
                                #[allow(clippy::cast_possible_truncation)]
                                let delay_ms = delay.as_millis() as u64;
                                tracing::debug!(profile_url = %job.candidate.profile_url, attempt = job.attempts, delay_ms, %reason, "transient fetch error, retrying");
                                delayed.push(wait_then(job, delay, self.shutdown.clone()));
                                continue;
                            }
                        }
                        Step::Refused(reason) => {
                            tally.hard_failures += 1;
                            tracing::error!(profile_url = %job.candidate.profile_url, %reason, "fetch permit refused");
                            FetchOutcome::HardFail { reason }
                        }
                        Step::Cancelled => {
                            tally.abandoned += 1;
                            FetchOutcome::SoftFail {
                                reason: SHUTDOWN_REASON.to_string(),
                            }
                        }
                    };

                    if let Some(next) = claims.release(&job.candidate.profile_url) {
                        ready.push_back(next);
                    }
                    let result = FetchResult {
                        candidate: job.candidate,
                        attempts: job.attempts,
                        outcome,
                    };
                    if tx.send(result).await.is_err() {
                        tracing::debug!("fetch result receiver dropped");
                    }
                }
                Some(job) = delayed.next(), if !delayed.is_empty() => {
                    ready.push_back(job);
                }
            }
        }

        tracing::info!(
            attempts = tally.attempts,
            successes = tally.successes,
            soft_failures = tally.soft_failures,
            hard_failures = tally.hard_failures,
            abandoned = tally.abandoned,
            "fetch stage complete"
        );
        tally
    }

    async fn attempt(&self, mut job: Job) -> (Job, Step) {
        let key = format!("{}_fetch", job.candidate.platform);
        match self.limiter.acquire(&key).await {
            Ok(()) => {}
            Err(RateLimitError::Cancelled { .. }) => return (job, Step::Cancelled),
            Err(e @ RateLimitError::ZeroBudget { .. }) => {
                return (job, Step::Refused(e.to_string()));
            }
        }

        job.attempts += 1;
        let step = match self.fetcher.fetch_profile(&job.candidate).await {
            Ok(record) => Step::Fetched(Box::new(record)),
            Err(e) if e.is_transient() => Step::Transient(e.to_string()),
            Err(e) => Step::Permanent(e.to_string()),
        };
        (job, step)
    }
}

/// Holds a job for `delay`, returning it early on shutdown so its next
/// permit wait resolves as cancelled.
async fn wait_then(job: Job, delay: Duration, shutdown: CancellationToken) -> Job {
    tokio::select! {
        () = tokio::time::sleep(delay) => {}
        () = shutdown.cancelled() => {}
    }
    job
}

#[cfg(test)]
#[path = "fetch_test.rs"]
mod tests;
