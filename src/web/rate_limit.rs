//! Process-wide, per-provider token bucket, grounded in the pack's sliding-window rate limiter
//! shape (`DashMap`-keyed state, refill-on-check) but simplified to the spec's single knob:
//! `max_queries_per_minute`.

use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(max_per_minute: u32) -> Self {
        let capacity = max_per_minute.max(1) as f64;
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared across all queries; one bucket per `provider_id`.
#[derive(Default)]
pub struct RateLimiter {
    buckets: DashMap<String, Mutex<Bucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { buckets: DashMap::new() }
    }

    /// Returns `true` if a call to `provider_id` is allowed right now, consuming one token.
    pub fn try_acquire(&self, provider_id: &str, max_queries_per_minute: u32) -> bool {
        let bucket = self
            .buckets
            .entry(provider_id.to_string())
            .or_insert_with(|| Mutex::new(Bucket::new(max_queries_per_minute)));
        bucket.lock().try_acquire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_capacity_then_blocks() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.try_acquire("provider-a", 3));
        }
        assert!(!limiter.try_acquire("provider-a", 3));
    }

    #[test]
    fn providers_have_independent_buckets() {
        let limiter = RateLimiter::new();
        for _ in 0..2 {
            assert!(limiter.try_acquire("a", 2));
        }
        assert!(limiter.try_acquire("b", 2));
    }
}
