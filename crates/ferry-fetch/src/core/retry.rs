use std::time::Duration;

/// Delay before retry number `retry_count` (0-indexed) with exponential
/// backoff: `base * 2^retry_count`, saturating instead of overflowing.
///
/// The fetcher never retries on its own; this is for callers that do.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ferry_fetch::retry_delay;
///
/// assert_eq!(retry_delay(0, Duration::from_millis(100)), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, Duration::from_millis(100)), Duration::from_millis(400));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier)
}
