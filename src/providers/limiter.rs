//! Rate Limiter Module
//!
//! One token bucket gates every outbound ledger call, shared by all
//! workers, so the aggregate request rate stays bounded no matter how
//! many traversals run concurrently.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket: capacity = rate, refilled continuously at rate/sec.
/// `acquire()` sleeps the exact deficit when no token is available.
/// Waiters queue on the mutex, FIFO-ish; starvation under heavy
/// contention is an accepted tradeoff.
pub struct RateLimiter {
    rate: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// `rate` = permits per rolling second; values below 0.1 are clamped
    pub fn new(rate: f64) -> Self {
        let rate = rate.max(0.1);
        Self {
            rate,
            bucket: Mutex::new(Bucket {
                tokens: rate,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Wait until a permit is available, then consume it.
    ///
    /// The lock is held across the deficit sleep: that serializes
    /// waiters, which is exactly what keeps the aggregate rate bounded
    /// for any number of concurrent callers.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.rate);
        bucket.last_refill = now;

        if bucket.tokens < 1.0 {
            let wait = (1.0 - bucket.tokens) / self.rate;
            debug!("⏳ Rate limiter: sleeping {:.0}ms", wait * 1000.0);
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
            bucket.last_refill = Instant::now();
            bucket.tokens = 0.0;
        } else {
            bucket.tokens -= 1.0;
        }
    }
}
