//! Retry delay helpers.

use std::time::Duration;

/// Delay before the retry that follows failure number `retries` (1-based).
///
/// Doubles from `base` on every failure and is capped at `max`. A zero base
/// means retries are immediate.
pub fn retry_delay(base: Duration, max: Duration, retries: u32) -> Duration {
    if base.is_zero() || retries == 0 {
        return Duration::ZERO;
    }
    let factor = 1u32.checked_shl(retries - 1).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_base_is_immediate() {
        assert_eq!(
            retry_delay(Duration::ZERO, Duration::from_secs(30), 4),
            Duration::ZERO
        );
    }

    #[test]
    fn doubles_per_failure() {
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(30);
        assert_eq!(retry_delay(base, max, 1), Duration::from_millis(100));
        assert_eq!(retry_delay(base, max, 2), Duration::from_millis(200));
        assert_eq!(retry_delay(base, max, 3), Duration::from_millis(400));
    }

    #[test]
    fn caps_at_max() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(250);
        assert_eq!(retry_delay(base, max, 3), max);
        assert_eq!(retry_delay(base, max, 64), max);
    }
}
