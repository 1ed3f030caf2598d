//! Property-based tests for credential rotation and backoff

use super::*;
use proptest::prelude::*;
use std::time::Duration;

fn pool_of(len: usize) -> CredentialPool {
    CredentialPool::new((0..len).map(|i| format!("key-{i}")))
}

fn fail(policy: &RetryPolicy, tracker: &mut RetryTracker, pool: &CredentialPool) -> RetryDecision {
    tracker.record_attempt();
    policy.on_transient_failure(tracker, pool)
}

proptest! {
    /// After N consecutive transient failures on an N-key pool the cursor is
    /// back where it started.
    #[test]
    fn prop_full_cycle_returns_cursor(len in 2usize..8, start in 0usize..8) {
        let pool = pool_of(len);
        for _ in 0..(start % len) {
            pool.rotate();
        }
        let origin = pool.cursor();
        let policy = RetryPolicy { max_attempts: 100, ..RetryPolicy::default() };
        let mut tracker = RetryTracker::default();

        for i in 0..len {
            let decision = fail(&policy, &mut tracker, &pool);
            if i + 1 < len {
                prop_assert!(
                    matches!(decision, RetryDecision::Rotate { .. }),
                    "untried keys remain, expected rotation",
                );
            } else {
                prop_assert_eq!(decision, RetryDecision::Backoff { delay: policy.backoff_delay(0) });
            }
        }
        prop_assert_eq!(pool.cursor(), origin);
    }

    #[test]
    fn prop_backoff_grows_geometrically(index in 0u32..16) {
        let policy = RetryPolicy::default();
        prop_assert_eq!(policy.backoff_delay(index), Duration::from_secs(1u64 << index));
    }

    #[test]
    fn prop_attempts_never_exceed_budget(len in 1usize..6, max_attempts in 1u32..10) {
        let pool = pool_of(len);
        let policy = RetryPolicy { max_attempts, ..RetryPolicy::default() };
        let mut tracker = RetryTracker::default();

        let mut attempts = 0;
        loop {
            attempts += 1;
            if fail(&policy, &mut tracker, &pool) == RetryDecision::GiveUp {
                break;
            }
            prop_assert!(attempts < max_attempts);
        }
        prop_assert_eq!(attempts, max_attempts);
        prop_assert_eq!(tracker.attempts, max_attempts);
    }

    #[test]
    fn prop_jitter_within_bound(max_ms in 0u64..1000) {
        let policy = RetryPolicy { max_jitter: Duration::from_millis(max_ms), ..RetryPolicy::default() };
        prop_assert!(policy.jitter() <= policy.max_jitter);
    }
}
