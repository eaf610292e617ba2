//! Discovery → fetch → reconcile pipeline for creator profiles.
//!
//! [`CycleController`] drives one [`DiscoveryStage`], one [`FetchScheduler`]
//! and one [`Reconciler`] per cycle around a shared [`RateLimiter`]. The
//! external browse, fetch and storage systems sit behind the traits in
//! [`traits`].

pub mod backoff;
pub mod cycle;
pub mod dedup;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod memory;
pub mod niche;
pub mod rate_limit;
pub mod reconcile;
pub mod sources;
pub mod store;
pub mod traits;
pub mod types;

pub use backoff::BackoffPolicy;
pub use cycle::{Collaborators, CycleController, CyclePhase, CycleSettings, CycleTotals};
pub use dedup::{DedupOutcome, Deduplicator};
pub use discovery::{DiscoveryPhase, DiscoveryReport, DiscoverySettings, DiscoveryStage};
pub use error::{PipelineError, RateLimitError, SourceError, StoreError};
pub use fetch::{FetchScheduler, FetchSettings, FetchTally};
pub use memory::MemoryStore;
pub use niche::NicheClassifier;
pub use rate_limit::{Budget, RateLimiter};
pub use reconcile::{validate, ReconcileEntry, ReconcileReport, Reconciler};
pub use sources::{ExtractBrowseSource, ExtractProfileFetcher};
pub use store::{to_cycle_run, PgCreatorStore};
pub use traits::{BrowseBatch, BrowseSession, BrowseSource, CreatorStore, ProfileFetcher, UpsertStatus};
pub use types::{
    CycleStats, Degradation, FetchOutcome, FetchResult, RecordOutcome, SHUTDOWN_REASON,
};
