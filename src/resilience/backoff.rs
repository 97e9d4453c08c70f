//! Exponential backoff between retry attempts.

use std::time::Duration;

/// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`,
/// capped at `max_ms`. Retry 0 means "no retry yet" and waits nothing.
pub fn calculate_backoff(retry: u32, base_ms: u64, max_ms: u64) -> Duration {
    if retry == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(retry - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);

    Duration::from_millis(delay_ms.min(max_ms))
}
