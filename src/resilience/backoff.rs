//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Calculate the backoff delay before the retry following `attempt`.
///
/// `attempt` is the 0-based index of the attempt that just failed. The
/// exponential component is `initial * multiplier^attempt`; a uniformly
/// random jitter in `[0, 0.3 * exponential)` is added, and the sum is
/// capped at `max`.
pub fn calculate_backoff(
    attempt: u32,
    initial: Duration,
    multiplier: f64,
    max: Duration,
) -> Duration {
    let exponential_ms = initial.as_millis() as f64 * multiplier.powi(attempt as i32);

    // Jitter spreads out synchronized retry storms.
    let jitter_bound = exponential_ms * 0.3;
    let jitter_ms = if jitter_bound > 0.0 {
        rand::thread_rng().gen_range(0.0..jitter_bound)
    } else {
        0.0
    };

    let delay_ms = (exponential_ms + jitter_ms).min(max.as_millis() as f64);
    Duration::from_millis(delay_ms.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_bounds() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_secs(10);

        for attempt in 0..4u32 {
            let exp = 100.0 * 2f64.powi(attempt as i32);
            let delay = calculate_backoff(attempt, initial, 2.0, max);
            assert!(delay.as_millis() as f64 >= exp);
            assert!(delay.as_millis() as f64 <= exp * 1.3 + 1.0);
        }
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let delay = calculate_backoff(
            20,
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(1_000),
        );
        assert_eq!(delay.as_millis(), 1_000);
    }

    #[test]
    fn test_backoff_first_retry_uses_initial() {
        let delay = calculate_backoff(
            0,
            Duration::from_millis(200),
            2.0,
            Duration::from_secs(10),
        );
        assert!(delay.as_millis() >= 200);
        assert!(delay.as_millis() <= 260);
    }
}
