//! Exponential backoff schedule.

use std::time::Duration;

/// Delay before re-attempting after attempt `attempt` (0-based) failed:
/// `base * 2^attempt`, saturating.
///
/// No jitter: the scraper is a single writer on a fixed schedule, and a
/// deterministic cadence keeps retry timing predictable in logs and tests.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(0, base), Duration::from_secs(1));
        assert_eq!(backoff_delay(1, base), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, base), Duration::from_secs(4));
        assert_eq!(backoff_delay(3, base), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_scales_fractional_base() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff_delay(2, base), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_saturates() {
        let delay = backoff_delay(40, Duration::from_secs(u64::MAX / 2));
        assert_eq!(delay, Duration::MAX);
    }
}
