//! Exponential backoff schedule used between retry attempts.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Produces the delay preceding retry `k + 1` after attempt `k` failed.
///
/// The schedule is `min(base << k, cap)`, with the exponent clamped so the
/// shift cannot overflow, and optionally widened by jitter drawn from
/// `[0, base)`.
pub struct BackoffSchedule {
    base: Duration,
    cap: Duration,
    rng: Option<StdRng>,
}

impl BackoffSchedule {
    /// Largest exponent ever applied to the base delay. Attempt indices
    /// beyond this are already saturated at the cap for any sane policy.
    const MAX_EXPONENT: u32 = 30;

    /// Create a schedule; `jitter` enables the random widening.
    pub fn new(base: Duration, cap: Duration, jitter: bool) -> Self {
        Self {
            base,
            cap,
            rng: jitter.then(StdRng::from_entropy),
        }
    }

    /// Delay to sleep after attempt `attempt` (zero-based) failed.
    pub fn delay(&mut self, attempt: u32) -> Duration {
        let exponent = attempt.min(Self::MAX_EXPONENT);
        let mut delay = self.base.saturating_mul(1u32 << exponent).min(self.cap);

        if let Some(rng) = self.rng.as_mut() {
            let base_ms = self.base.as_millis().min(u128::from(u64::MAX)) as u64;
            if base_ms > 0 {
                delay += Duration::from_millis(rng.gen_range(0..base_ms));
            }
        }

        delay
    }
}

impl std::fmt::Debug for BackoffSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackoffSchedule")
            .field("base", &self.base)
            .field("cap", &self.cap)
            .field("jitter", &self.rng.is_some())
            .finish()
    }
}
