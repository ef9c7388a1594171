//! Backoff state for the request retry loop.
//!
//! The state is owned by a single `RequestClient::request` call and dropped
//! when it returns; nothing here is shared between requests.

use std::time::Duration;

/// Initial wait after the first transient failure
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound for a single computed wait
pub const MAX_BACKOFF: Duration = Duration::from_secs(64);

/// Doubling backoff capped at a maximum interval.
///
/// With the defaults the sequence is 1s, 2s, 4s, 8s, 16s, 32s, 64s, 64s, ...
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    /// Create a backoff starting at `initial` and never exceeding `max`
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    /// Return the current wait and double it for the next call
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF, MAX_BACKOFF)
    }
}

/// Parse a `Retry-After` header value given in whole seconds.
///
/// Anything other than a non-negative integer (HTTP dates, negative or
/// fractional numbers) yields `None` and the computed backoff applies.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
