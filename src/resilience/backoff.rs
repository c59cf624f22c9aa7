//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Share of the capped delay added as random jitter (10%).
const JITTER_DIVISOR: u64 = 10;

/// Delay before retrying after failed attempt `attempt` (1-based).
///
/// Doubles from `base_ms` per attempt, capped at `max_ms`, plus up to 10%
/// jitter. Attempt 0 waits nothing.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / JITTER_DIVISOR;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_uses_base() {
        let delay = calculate_backoff(1, 500, 10_000);
        assert!(delay >= Duration::from_millis(500));
        assert!(delay < Duration::from_millis(550));
    }

    #[test]
    fn test_doubles_then_caps() {
        assert!(calculate_backoff(3, 100, 10_000) >= Duration::from_millis(400));
        assert!(calculate_backoff(64, 100, 1000) >= Duration::from_millis(1000));
        assert!(calculate_backoff(64, 100, 1000) < Duration::from_millis(1100));
    }

    #[test]
    fn test_zero_attempt_and_zero_base() {
        assert_eq!(calculate_backoff(0, 100, 1000), Duration::ZERO);
        assert_eq!(calculate_backoff(5, 0, 0), Duration::ZERO);
    }
}
