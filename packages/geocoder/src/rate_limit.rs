//! Process-wide minimum spacing between outbound provider requests.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Hands out request start times spaced at least `min_delay` apart.
///
/// Each caller reserves the next free slot under a short lock and then
/// sleeps until that slot outside the lock, so callers queue in arrival
/// order without spinning and without a lock held across the request.
pub struct RateLimiter {
    min_delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum spacing.
    #[must_use]
    pub const fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: Mutex::new(None),
        }
    }

    /// Configured minimum spacing.
    #[must_use]
    pub const fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits until the caller may send its request.
    pub async fn acquire(&self) {
        let start = {
            let mut next = self
                .next_slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let start = next.map_or(now, |slot| slot.max(now));
            *next = Some(start + self.min_delay);
            start
        };

        if start > Instant::now() {
            log::trace!("Rate limiter holding request for {:?}", start - Instant::now());
        }
        tokio::time::sleep_until(start).await;
    }
}
