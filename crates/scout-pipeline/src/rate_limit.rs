//! Fixed-window permit budgets keyed by `{platform}_{operation}`.
//!
//! Each key owns a window that starts on first use. Once `max_permits` have
//! been granted, callers of [`RateLimiter::acquire`] sleep until the window
//! boundary and then compete for the fresh window. Windows live behind a
//! single async mutex that is never held across a sleep.

use std::collections::HashMap;
use std::time::Duration;

use scout_core::{DefaultBudget, DiscoveryConfig, RateBudgetConfig};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::RateLimitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_permits: u32,
    pub window: Duration,
}

#[derive(Debug)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

/// Shared across every stage of a cycle and across cycles.
#[derive(Debug)]
pub struct RateLimiter {
    budgets: HashMap<String, Budget>,
    default_budget: Budget,
    windows: Mutex<HashMap<String, RateWindow>>,
    shutdown: CancellationToken,
}

impl RateLimiter {
    /// Builds a limiter from named budgets plus a fallback for unknown keys.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::ZeroBudget`] if any budget, including the
    /// default, allows zero permits or has a zero-length window.
    pub fn new(budgets: &[RateBudgetConfig], default: DefaultBudget) -> Result<Self, RateLimitError> {
        let default_budget = Budget {
            max_permits: default.max_permits,
            window: Duration::from_secs(default.window_secs),
        };
        check_budget("default", default_budget)?;

        let mut named = HashMap::with_capacity(budgets.len());
        for cfg in budgets {
            let budget = Budget {
                max_permits: cfg.max_permits,
                window: Duration::from_secs(cfg.window_secs),
            };
            check_budget(&cfg.key, budget)?;
            named.insert(cfg.key.clone(), budget);
        }

        Ok(Self {
            budgets: named,
            default_budget,
            windows: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Builds a limiter from the budgets in the discovery file.
    ///
    /// # Errors
    ///
    /// See [`RateLimiter::new`].
    pub fn from_discovery(config: &DiscoveryConfig) -> Result<Self, RateLimitError> {
        Self::new(&config.rate_budgets, config.default_budget)
    }

    /// Interrupt pending [`acquire`](Self::acquire) waits when `token` fires.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    #[must_use]
    pub fn budget_for(&self, key: &str) -> Budget {
        self.budgets.get(key).copied().unwrap_or(self.default_budget)
    }

    /// Waits until a permit for `key` is available and takes it.
    ///
    /// Suspends for exactly the remaining window time when the budget is
    /// spent; never polls.
    ///
    /// # Errors
    ///
    /// - [`RateLimitError::Cancelled`] if shutdown was requested before or
    ///   during the wait.
    /// - [`RateLimitError::ZeroBudget`] if the budget can never grant a permit.
    pub async fn acquire(&self, key: &str) -> Result<(), RateLimitError> {
        let budget = self.budget_for(key);
        check_budget(key, budget)?;

        loop {
            if self.shutdown.is_cancelled() {
                return Err(RateLimitError::Cancelled {
                    key: key.to_string(),
                });
            }

            let wait = match self.take_permit(key, budget).await {
                Ok(()) => return Ok(()),
                Err(wait) => wait,
            };

            #[allow(clippy::cast_possible_truncation)]
            let wait_ms = wait.as_millis() as u64;
            tracing::debug!(key, wait_ms, "rate budget exhausted; waiting for next window");

            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    return Err(RateLimitError::Cancelled { key: key.to_string() });
                }
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Takes a permit for `key` only if one is available right now.
    pub async fn try_acquire(&self, key: &str) -> bool {
        let budget = self.budget_for(key);
        if check_budget(key, budget).is_err() {
            return false;
        }
        self.take_permit(key, budget).await.is_ok()
    }

    /// Permits granted so far in the current window for `key`.
    pub async fn consumed(&self, key: &str) -> u32 {
        let budget = self.budget_for(key);
        let windows = self.windows.lock().await;
        windows
            .get(key)
            .filter(|w| w.started_at.elapsed() < budget.window)
            .map_or(0, |w| w.count)
    }

    /// `Ok` when a permit was taken, otherwise the time left in the window.
    async fn take_permit(&self, key: &str, budget: Budget) -> Result<(), Duration> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let window = windows.entry(key.to_string()).or_insert(RateWindow {
            started_at: now,
            count: 0,
        });

        let elapsed = now.duration_since(window.started_at);
        if elapsed >= budget.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count < budget.max_permits {
            window.count += 1;
            return Ok(());
        }

        Err(budget.window - now.duration_since(window.started_at))
    }
}

fn check_budget(key: &str, budget: Budget) -> Result<(), RateLimitError> {
    if budget.max_permits == 0 || budget.window.is_zero() {
        return Err(RateLimitError::ZeroBudget {
            key: key.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn limiter(max_permits: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(
            &[RateBudgetConfig::new("instagram_fetch", max_permits, window_secs)],
            DefaultBudget {
                max_permits: 1,
                window_secs: 10,
            },
        )
        .unwrap()
    }

    #[test]
    fn zero_permit_budget_is_rejected_at_construction() {
        let err = RateLimiter::new(
            &[RateBudgetConfig::new("instagram_fetch", 0, 60)],
            DefaultBudget {
                max_permits: 1,
                window_secs: 60,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            RateLimitError::ZeroBudget {
                key: "instagram_fetch".to_string()
            }
        );
    }

    #[test]
    fn zero_default_budget_is_rejected() {
        let err = RateLimiter::new(
            &[],
            DefaultBudget {
                max_permits: 0,
                window_secs: 60,
            },
        )
        .unwrap_err();
        assert!(matches!(err, RateLimitError::ZeroBudget { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn try_acquire_respects_budget_and_resets_after_window() {
        let limiter = limiter(2, 60);
        assert!(limiter.try_acquire("instagram_fetch").await);
        assert!(limiter.try_acquire("instagram_fetch").await);
        assert!(!limiter.try_acquire("instagram_fetch").await);
        assert_eq!(limiter.consumed("instagram_fetch").await, 2);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.try_acquire("instagram_fetch").await);
        assert_eq!(limiter.consumed("instagram_fetch").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_sleeps_exactly_until_window_boundary() {
        let limiter = limiter(1, 30);
        let start = Instant::now();
        limiter.acquire("instagram_fetch").await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        limiter.acquire("instagram_fetch").await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_keys_use_default_budget() {
        let limiter = limiter(5, 60);
        assert!(limiter.try_acquire("tiktok_fetch").await);
        assert!(!limiter.try_acquire("tiktok_fetch").await);
        assert_eq!(
            limiter.budget_for("tiktok_fetch"),
            Budget {
                max_permits: 1,
                window: Duration::from_secs(10)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let limiter = limiter(1, 60);
        assert!(limiter.try_acquire("instagram_fetch").await);
        assert!(limiter.try_acquire("linkedin_fetch").await);
        assert!(!limiter.try_acquire("instagram_fetch").await);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquirers_never_exceed_budget_per_window() {
        let limiter = Arc::new(limiter(3, 10));
        let origin = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire("instagram_fetch").await.unwrap();
                origin.elapsed()
            }));
        }

        let mut per_window: HashMap<u64, u32> = HashMap::new();
        for handle in handles {
            let granted_at = handle.await.unwrap();
            *per_window.entry(granted_at.as_secs() / 10).or_default() += 1;
        }

        assert_eq!(per_window.values().sum::<u32>(), 10);
        assert!(per_window.values().all(|n| *n <= 3), "{per_window:?}");
        assert_eq!(per_window.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_pending_wait() {
        let token = CancellationToken::new();
        let limiter = Arc::new(limiter(1, 3_600).with_shutdown(token.clone()));
        limiter.acquire("instagram_fetch").await.unwrap();

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire("instagram_fetch").await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(RateLimitError::Cancelled { .. })));
    }
}
