//! Validation, niche assignment and keyed upsert of fetched profiles.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use scout_core::{ProfileRecord, MAX_POSTS_PER_LIST};
use tokio::sync::mpsc;

use crate::niche::NicheClassifier;
use crate::traits::{CreatorStore, UpsertStatus};
use crate::types::{FetchOutcome, FetchResult, RecordOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileEntry {
    pub profile_url: String,
    /// Whether the candidate itself is to blame: a fetch failure other than
    /// shutdown, or a record that failed validation.
    pub counts_as_failure: bool,
    pub outcome: RecordOutcome,
}

/// Per-record outcomes of one reconcile run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// In completion order.
    pub entries: Vec<ReconcileEntry>,
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
    pub store_failures: usize,
    pub skipped: usize,
}

impl ReconcileReport {
    fn push(&mut self, entry: ReconcileEntry) {
        match &entry.outcome {
            RecordOutcome::Inserted => self.inserted += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Rejected(_) => self.rejected += 1,
            RecordOutcome::StoreFailed(_) => self.store_failures += 1,
            RecordOutcome::Skipped => self.skipped += 1,
        }
        self.entries.push(entry);
    }
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn CreatorStore>,
    classifier: NicheClassifier,
    concurrency: usize,
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn CreatorStore>, classifier: NicheClassifier, concurrency: usize) -> Self {
        Self {
            store,
            classifier,
            concurrency: concurrency.max(1),
        }
    }

    /// Applies one fetch result to the store.
    ///
    /// Failed fetches never touch the store. Successful ones are validated,
    /// given a niche and upserted by profile URL.
    pub async fn reconcile(&self, result: &FetchResult) -> RecordOutcome {
        let FetchOutcome::Success(fetched) = &result.outcome else {
            return RecordOutcome::Skipped;
        };

        let mut record = match validate(fetched) {
            Ok(record) => record,
            Err(reason) => {
                tracing::warn!(profile_url = %fetched.profile_url, %reason, "rejecting fetched profile");
                return RecordOutcome::Rejected(reason);
            }
        };

        record.niche = result
            .candidate
            .niche_hint
            .filter(|n| n.is_known())
            .or(record.niche.filter(|n| n.is_known()))
            .or_else(|| {
                Some(self.classifier.classify(&record.classifier_text())).filter(|n| n.is_known())
            });

        match self.store.upsert(&record).await {
            Ok(UpsertStatus::Inserted) => {
                tracing::debug!(profile_url = %record.profile_url, "creator inserted");
                RecordOutcome::Inserted
            }
            Ok(UpsertStatus::Updated) => {
                tracing::debug!(profile_url = %record.profile_url, "creator updated");
                RecordOutcome::Updated
            }
            Err(e) => {
                tracing::error!(profile_url = %record.profile_url, error = %e, "creator upsert failed");
                RecordOutcome::StoreFailed(e.to_string())
            }
        }
    }

    /// Reconciles results as they arrive, up to `concurrency` at a time,
    /// until the sender side closes.
    pub async fn run(&self, mut rx: mpsc::Receiver<FetchResult>) -> ReconcileReport {
        let entries: Vec<ReconcileEntry> = stream::poll_fn(|cx| rx.poll_recv(cx))
            .map(|result| async move {
                let outcome = self.reconcile(&result).await;
                ReconcileEntry {
                    counts_as_failure: result.outcome.counts_against_candidate()
                        || matches!(outcome, RecordOutcome::Rejected(_)),
                    profile_url: result.candidate.profile_url,
                    outcome,
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = ReconcileReport::default();
        for entry in entries {
            report.push(entry);
        }
        tracing::info!(
            inserted = report.inserted,
            updated = report.updated,
            rejected = report.rejected,
            store_failures = report.store_failures,
            skipped = report.skipped,
            "reconcile stage complete"
        );
        report
    }
}

/// Checks the natural key and cleans optional fields into their valid ranges.
///
/// # Errors
///
/// Returns the rejection reason when the profile URL is missing or is not
/// an http(s) URL.
pub fn validate(fetched: &ProfileRecord) -> Result<ProfileRecord, String> {
    let profile_url = fetched.profile_url.trim();
    if profile_url.is_empty() {
        return Err("profile_url is empty".to_string());
    }
    if !(profile_url.starts_with("https://") || profile_url.starts_with("http://")) {
        return Err(format!("profile_url is not an http(s) URL: {profile_url}"));
    }

    let mut record = fetched.clone();
    record.profile_url = profile_url.to_string();
    record.public_contact_email = record
        .public_contact_email
        .take()
        .map(|e| e.trim().to_string())
        .filter(|e| scout_extract::is_valid_email(e));
    record.engagement_rate = record
        .engagement_rate
        .filter(|r| r.is_finite())
        .map(|r| r.clamp(0.0, 1.0));
    for count in [
        &mut record.follower_count,
        &mut record.following_count,
        &mut record.post_count,
    ] {
        *count = count.filter(|n| *n >= 0);
    }
    record.top_posts.truncate(MAX_POSTS_PER_LIST);
    record.recent_posts_sample.truncate(MAX_POSTS_PER_LIST);
    Ok(record)
}
