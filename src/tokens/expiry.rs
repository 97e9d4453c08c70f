//! Textual lifetime parsing ("30s", "15m", "12h", "7d").

use std::time::Duration;

/// Lifetime used when a configured value cannot be parsed.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// Parse a lifetime with a single trailing unit suffix.
pub fn parse_expiry_strict(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit_secs) = if let Some(n) = value.strip_suffix('s') {
        (n, 1)
    } else if let Some(n) = value.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = value.strip_suffix('h') {
        (n, 60 * 60)
    } else if let Some(n) = value.strip_suffix('d') {
        (n, 24 * 60 * 60)
    } else {
        return None;
    };

    let amount: u64 = digits.parse().ok()?;
    amount.checked_mul(unit_secs).map(Duration::from_secs)
}

/// Parse a lifetime, falling back to [`DEFAULT_EXPIRY`] when malformed.
pub fn parse_expiry(value: &str) -> Duration {
    parse_expiry_strict(value).unwrap_or(DEFAULT_EXPIRY)
}
