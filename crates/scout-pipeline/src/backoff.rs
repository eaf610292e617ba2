use std::time::Duration;

/// Exponential backoff with ±25% jitter, capped at a ceiling.
///
/// | Attempt | Delay before the next try        |
/// |---------|----------------------------------|
/// | 1       | base × 2⁰ ± 25 %                 |
/// | 2       | base × 2¹ ± 25 %                 |
/// | 3       | base × 2² ± 25 %                 |
///
/// The jittered value never exceeds `ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    ceiling: Duration,
}

impl BackoffPolicy {
    #[must_use]
    pub fn new(base: Duration, ceiling: Duration) -> Self {
        Self {
            base,
            ceiling: ceiling.max(base),
        }
    }

    #[must_use]
    pub fn from_millis(base_ms: u64, ceiling_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(base_ms),
            Duration::from_millis(ceiling_ms),
        )
    }

    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Un-jittered delay after `failed_attempts` failures (1-based).
    #[must_use]
    pub fn nominal(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(20);
        self.base
            .saturating_mul(1u32 << exponent)
            .min(self.ceiling)
    }

    /// Jittered delay after `failed_attempts` failures (1-based).
    #[must_use]
    pub fn delay(&self, failed_attempts: u32) -> Duration {
        let nominal = self.nominal(failed_attempts);
        let jitter = rand::random::<f64>() * 0.5 + 0.75;
        nominal.mul_f64(jitter).min(self.ceiling)
    }
}
