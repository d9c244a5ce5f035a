// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{sleep, Duration, Instant};

/// Held for the duration of one request; the next caller waits on it.
pub type RatePermit<'a> = MutexGuard<'a, Option<Instant>>;

/// Process-wide throttle for Deezer API calls.
///
/// Deezer allows 50 requests per 5 seconds per user. Clones share the same
/// clock, so every search issued through any clone of a client is serialized
/// and spaced by at least `min_interval`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until a request can be made. Hold the permit for the duration of the request.
    pub async fn acquire(&self) -> RatePermit<'_> {
        let mut last = self.last_request.lock().await;
        if let Some(last_instant) = *last {
            let elapsed = last_instant.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::trace!(target: "deezer", "rate limiting: waiting {:?}", wait_time);
                sleep(wait_time).await;
            }
        }
        *last = Some(Instant::now());
        last
    }
}
