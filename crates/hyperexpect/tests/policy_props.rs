//! Property tests for retry backoff and policy parsing.

use std::time::Duration;

use hyperexpect::{Backoff, RedirectPolicy, RetryPolicy};
use proptest::prelude::*;

proptest! {
    #[test]
    fn backoff_stays_within_bounds(min_ms in 0u64..10_000, extra_ms in 0u64..60_000, retry in 0u32..64) {
        let min = Duration::from_millis(min_ms);
        let max = Duration::from_millis(min_ms + extra_ms);
        let backoff = Backoff::new(min, max);
        let delay = backoff.delay(retry);
        prop_assert!(delay >= min.min(max));
        prop_assert!(delay <= max);
    }

    #[test]
    fn backoff_never_shrinks(min_ms in 1u64..1_000, extra_ms in 0u64..60_000, retry in 0u32..40) {
        let backoff = Backoff::new(
            Duration::from_millis(min_ms),
            Duration::from_millis(min_ms + extra_ms),
        );
        prop_assert!(backoff.delay(retry + 1) >= backoff.delay(retry));
    }

    #[test]
    fn inverted_bounds_are_clamped(min_ms in 1u64..10_000, below in 1u64..10_000) {
        let min = Duration::from_millis(min_ms);
        let backoff = Backoff::new(min, min.saturating_sub(Duration::from_millis(below)));
        prop_assert_eq!(backoff.max_delay, min);
        prop_assert_eq!(backoff.delay(0), min);
    }
}

#[test]
fn policy_names_round_trip() {
    for policy in [
        RetryPolicy::DontRetry,
        RetryPolicy::RetryTimeoutErrors,
        RetryPolicy::RetryTimeoutAndServerErrors,
        RetryPolicy::RetryAllErrors,
    ] {
        assert_eq!(policy.to_string().parse::<RetryPolicy>(), Ok(policy));
    }
    for policy in [
        RedirectPolicy::DontFollowRedirects,
        RedirectPolicy::FollowAllRedirects,
        RedirectPolicy::FollowRedirectsWithoutBody,
    ] {
        assert_eq!(policy.to_string().parse::<RedirectPolicy>(), Ok(policy));
    }
    assert!("sometimes".parse::<RetryPolicy>().is_err());
}
