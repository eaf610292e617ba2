use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use scout_core::{DefaultBudget, Platform, RateBudgetConfig};
use tokio::time::Instant;

use super::*;
use crate::error::SourceError;

/// Fetcher that follows a per-handle script (empty means success) and
/// records concurrency.
struct InstrumentedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<SourceError>>>,
    latency: Duration,
    current: AtomicUsize,
    high_water: AtomicUsize,
    active_keys: Mutex<HashSet<String>>,
    overlaps: AtomicUsize,
    starts: Mutex<Vec<(String, Instant)>>,
}

impl InstrumentedFetcher {
    fn new(latency: Duration) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            latency,
            current: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            active_keys: Mutex::new(HashSet::new()),
            overlaps: AtomicUsize::new(0),
            starts: Mutex::new(Vec::new()),
        }
    }

    fn script(self, handle: &str, failures: Vec<SourceError>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(handle.to_string(), failures.into_iter().collect());
        self
    }

    fn starts_for(&self, handle: &str) -> Vec<Instant> {
        self.starts
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == handle)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl ProfileFetcher for InstrumentedFetcher {
    async fn fetch_profile(&self, candidate: &Candidate) -> Result<ProfileRecord, SourceError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        if !self
            .active_keys
            .lock()
            .unwrap()
            .insert(candidate.profile_url.clone())
        {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.starts
            .lock()
            .unwrap()
            .push((candidate.handle.clone(), Instant::now()));

        tokio::time::sleep(self.latency).await;

        self.active_keys
            .lock()
            .unwrap()
            .remove(&candidate.profile_url);
        self.current.fetch_sub(1, Ordering::SeqCst);

        let failure = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&candidate.handle)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(err) => Err(err),
            None => Ok(ProfileRecord::new(
                candidate.platform,
                candidate.profile_url.clone(),
            )),
        }
    }
}

fn limiter(budgets: &[RateBudgetConfig]) -> Arc<RateLimiter> {
    Arc::new(
        RateLimiter::new(
            budgets,
            DefaultBudget {
                max_permits: 1_000,
                window_secs: 60,
            },
        )
        .unwrap(),
    )
}

fn settings(concurrency: usize) -> FetchSettings {
    FetchSettings {
        concurrency,
        max_attempts: 3,
        backoff: BackoffPolicy::from_millis(1_000, 1_000),
    }
}

fn ig(handle: &str) -> Candidate {
    Candidate::new(Platform::Instagram, handle)
}

fn transient() -> SourceError {
    SourceError::Transient("503".to_string())
}

async fn run(
    scheduler: &FetchScheduler,
    candidates: Vec<Candidate>,
) -> (FetchTally, Vec<FetchResult>) {
    let (tx, mut rx) = mpsc::channel(64);
    let tally = scheduler.run(candidates, tx).await;
    let mut results = Vec::new();
    while let Some(result) = rx.recv().await {
        results.push(result);
    }
    (tally, results)
}

fn outcome_for<'a>(results: &'a [FetchResult], handle: &str) -> &'a FetchOutcome {
    &results
        .iter()
        .find(|r| r.candidate.handle == handle)
        .unwrap()
        .outcome
}

#[tokio::test(start_paused = true)]
async fn one_result_per_candidate_with_mixed_outcomes() {
    let fetcher = InstrumentedFetcher::new(Duration::from_millis(10))
        .script("gone", vec![SourceError::Permanent("404".to_string())])
        .script("flaky", vec![transient()])
        .script("down", vec![transient(), transient(), transient()]);
    let scheduler = FetchScheduler::new(
        Arc::new(fetcher),
        limiter(&[]),
        settings(2),
        CancellationToken::new(),
    );

    let (tally, results) = run(
        &scheduler,
        vec![ig("ok"), ig("gone"), ig("flaky"), ig("down")],
    )
    .await;

    assert_eq!(results.len(), 4);
    assert!(outcome_for(&results, "ok").is_success());
    assert!(outcome_for(&results, "flaky").is_success());
    assert!(matches!(
        outcome_for(&results, "gone"),
        FetchOutcome::HardFail { .. }
    ));
    match outcome_for(&results, "down") {
        FetchOutcome::HardFail { reason } => assert!(reason.contains("3 attempts"), "{reason}"),
        other => panic!("expected hard failure, got {other:?}"),
    }

    let down = results.iter().find(|r| r.candidate.handle == "down").unwrap();
    assert_eq!(down.attempts, 3);
    assert_eq!(
        tally,
        FetchTally {
            attempts: 7,
            successes: 2,
            soft_failures: 4,
            hard_failures: 2,
            abandoned: 0,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn in_flight_fetches_never_exceed_concurrency() {
    let fetcher = Arc::new(InstrumentedFetcher::new(Duration::from_millis(100)));
    let scheduler = FetchScheduler::new(
        fetcher.clone(),
        limiter(&[]),
        settings(3),
        CancellationToken::new(),
    );

    let candidates = (0..10).map(|i| ig(&format!("creator{i}"))).collect();
    let (tally, results) = run(&scheduler, candidates).await;

    assert_eq!(results.len(), 10);
    assert_eq!(tally.successes, 10);
    assert_eq!(fetcher.high_water.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn duplicate_candidates_are_never_fetched_concurrently() {
    let fetcher = Arc::new(
        InstrumentedFetcher::new(Duration::from_millis(50)).script("dup", vec![transient()]),
    );
    let scheduler = FetchScheduler::new(
        fetcher.clone(),
        limiter(&[]),
        settings(4),
        CancellationToken::new(),
    );

    let (_, results) = run(&scheduler, vec![ig("dup"), ig("dup"), ig("other"), ig("dup")]).await;

    assert_eq!(results.len(), 4);
    assert_eq!(fetcher.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(
        results.iter().filter(|r| r.candidate.handle == "dup").count(),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn fetch_permits_follow_the_platform_budget() {
    let fetcher = Arc::new(InstrumentedFetcher::new(Duration::from_millis(1)));
    let scheduler = FetchScheduler::new(
        fetcher.clone(),
        limiter(&[RateBudgetConfig::new("instagram_fetch", 2, 10)]),
        settings(4),
        CancellationToken::new(),
    );

    let origin = Instant::now();
    let (tally, _) = run(&scheduler, vec![ig("a"), ig("b"), ig("c"), ig("d")]).await;
    assert_eq!(tally.successes, 4);

    let mut per_window: HashMap<u64, usize> = HashMap::new();
    for handle in ["a", "b", "c", "d"] {
        for at in fetcher.starts_for(handle) {
            *per_window
                .entry(at.duration_since(origin).as_secs() / 10)
                .or_default() += 1;
        }
    }
    assert_eq!(per_window.get(&0), Some(&2));
    assert_eq!(per_window.get(&1), Some(&2));
}

#[tokio::test(start_paused = true)]
async fn retry_waits_for_a_bounded_backoff() {
    let fetcher = Arc::new(
        InstrumentedFetcher::new(Duration::from_millis(10)).script("flaky", vec![transient()]),
    );
    let scheduler = FetchScheduler::new(
        fetcher.clone(),
        limiter(&[]),
        settings(1),
        CancellationToken::new(),
    );

    let (tally, results) = run(&scheduler, vec![ig("flaky")]).await;
    assert!(results[0].outcome.is_success());
    assert_eq!(results[0].attempts, 2);
    assert_eq!(tally.soft_failures, 1);

    let starts = fetcher.starts_for("flaky");
    let gap = starts[1].duration_since(starts[0]);
    // 10ms fetch latency plus a jittered 1s delay capped at the 1s ceiling.
    assert!(gap >= Duration::from_millis(760), "{gap:?}");
    assert!(gap <= Duration::from_millis(1_010), "{gap:?}");
}

#[tokio::test(start_paused = true)]
async fn shutdown_abandons_candidates_waiting_for_permits() {
    let token = CancellationToken::new();
    let fetcher = Arc::new(InstrumentedFetcher::new(Duration::from_millis(10)));
    let scheduler = FetchScheduler::new(
        fetcher.clone(),
        limiter(&[RateBudgetConfig::new("instagram_fetch", 1, 3_600)]),
        settings(3),
        token.clone(),
    );

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });
    let (tally, results) = run(&scheduler, vec![ig("a"), ig("b"), ig("c")]).await;
    canceller.await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(tally.successes, 1);
    assert_eq!(tally.abandoned, 2);
    let shutdown: Vec<&FetchResult> = results
        .iter()
        .filter(|r| {
            matches!(&r.outcome, FetchOutcome::SoftFail { reason } if reason == SHUTDOWN_REASON)
        })
        .collect();
    assert_eq!(shutdown.len(), 2);
    assert!(shutdown.iter().all(|r| r.attempts == 0));
}

#[tokio::test(start_paused = true)]
async fn transient_failure_after_shutdown_is_not_retried_or_blamed() {
    let token = CancellationToken::new();
    let fetcher = Arc::new(
        InstrumentedFetcher::new(Duration::from_secs(2)).script("a", vec![transient()]),
    );
    let scheduler = FetchScheduler::new(fetcher.clone(), limiter(&[]), settings(1), token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });
    let (tally, results) = run(&scheduler, vec![ig("a")]).await;
    canceller.await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].attempts, 1);
    assert_eq!(
        results[0].outcome,
        FetchOutcome::SoftFail {
            reason: SHUTDOWN_REASON.to_string()
        }
    );
    assert!(!results[0].outcome.counts_against_candidate());
    assert_eq!(tally.attempts, 1);
    assert_eq!(tally.soft_failures, 1);
    assert_eq!(tally.abandoned, 1);
    assert_eq!(fetcher.starts_for("a").len(), 1);
}

#[test]
fn claims_hand_keys_to_parked_jobs_in_order() {
    let mut claims = Claims::default();
    let first = claims.admit(Job {
        candidate: ig("x"),
        attempts: 0,
    });
    assert!(first.is_some());
    assert!(claims
        .admit(Job {
            candidate: ig("x"),
            attempts: 0,
        })
        .is_none());

    let url = ig("x").profile_url;
    assert!(claims.release(&url).is_some());
    assert!(claims.release(&url).is_none());
    assert!(claims.admit(Job {
        candidate: ig("x"),
        attempts: 0,
    })
    .is_some());
}
