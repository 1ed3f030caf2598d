//! Retry policy: credential rotation first, exponential backoff after

use super::CredentialPool;
use rand::Rng;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_ROTATION_PAUSE: Duration = Duration::from_millis(250);
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(250);

/// How the gateway reacts to throttling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per invocation, the first one included
    pub max_attempts: u32,
    /// Pause before retrying on a freshly rotated credential
    pub rotation_pause: Duration,
    /// First backoff wait; doubles on each further backoff
    pub backoff_base: Duration,
    /// Upper bound of the random jitter added to backoff waits
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rotation_pause: DEFAULT_ROTATION_PAUSE,
            backoff_base: DEFAULT_BACKOFF_BASE,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

/// What to do after a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Switched to an untried credential; retry after a short pause
    Rotate { pause: Duration },
    /// Every credential is throttled; wait `delay` (before jitter) and retry
    Backoff { delay: Duration },
    /// Attempt budget spent
    GiveUp,
}

/// Per-invocation bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryTracker {
    pub attempts: u32,
    pub rotations: usize,
    pub backoffs: u32,
}

impl RetryTracker {
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }
}

impl RetryPolicy {
    /// Backoff wait for the `index`-th backoff (0-based): `base * 2^index`
    pub fn backoff_delay(&self, index: u32) -> Duration {
        let factor = 1u32.checked_shl(index).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }

    /// Random jitter in `[0, max_jitter]`
    pub fn jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    /// Decide the next step after a transient failure.
    ///
    /// With more than one credential the cursor advances on every transient
    /// failure. While some credential has not been tried in this invocation
    /// the retry follows a short pause; once the cursor has come full circle
    /// (or with a single credential) the wait switches to exponential
    /// backoff.
    pub fn on_transient_failure(
        &self,
        tracker: &mut RetryTracker,
        pool: &CredentialPool,
    ) -> RetryDecision {
        if tracker.attempts >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        let pool_len = pool.len();
        if pool_len > 1 {
            pool.rotate();
            tracker.rotations += 1;
            if tracker.rotations < pool_len {
                return RetryDecision::Rotate {
                    pause: self.rotation_pause,
                };
            }
        }

        let delay = self.backoff_delay(tracker.backoffs);
        tracker.backoffs += 1;
        RetryDecision::Backoff { delay }
    }
}
