//! The REST rate-limit governor.
//!
//! Requests are admitted per bucket: one permit per bucket held for the
//! whole request round-trip, so requests sharing a bucket go out in
//! caller-submission order while distinct buckets run fully in parallel.
//! A process-wide lockout (429 + global marker) quiesces every bucket
//! until its retry-after elapses.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

/// How long an idle bucket is retained after its window has elapsed.
const BUCKET_IDLE_TTL: Duration = Duration::from_secs(5 * 60);

/// Minimum spacing between idle-bucket sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Rate-limit state for one route bucket.
#[derive(Debug)]
pub(crate) struct Bucket {
    key: String,

    /// FIFO admission gate. One permit; holders keep it across the whole
    /// request including transparent retries.
    gate: Arc<Semaphore>,

    /// Maximum requests per window, from `X-RateLimit-Limit`.
    limit: Mutex<u32>,

    /// Requests left in the current window.
    remaining: Mutex<u32>,

    /// When the window rolls over; `None` until the first response.
    reset_at: Mutex<Option<Instant>>,

    /// Last admission or header update, for idle pruning.
    last_used: Mutex<Instant>,
}

impl Bucket {
    fn new(key: String) -> Self {
        Self {
            key,
            gate: Arc::new(Semaphore::new(1)),
            limit: Mutex::new(1),
            remaining: Mutex::new(1),
            reset_at: Mutex::new(None),
            last_used: Mutex::new(Instant::now()),
        }
    }

    /// Join this bucket's FIFO queue.
    pub(crate) async fn admit(&self) -> Result<OwnedSemaphorePermit, crate::HttpError> {
        *self.last_used.lock() = Instant::now();
        self.gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| crate::HttpError::Client("bucket gate closed".to_string()))
    }

    fn remaining(&self) -> u32 {
        *self.remaining.lock()
    }

    fn reset_at(&self) -> Option<Instant> {
        *self.reset_at.lock()
    }

    /// Whether this bucket can be pruned.
    fn is_idle(&self) -> bool {
        let queue_empty = self.gate.available_permits() == 1;
        let window_over = self.reset_at().map_or(true, |t| t <= Instant::now());
        let stale = self.last_used.lock().elapsed() >= BUCKET_IDLE_TTL;
        queue_empty && window_over && stale
    }
}

/// Rate-limit header values extracted from a response.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct BucketSnapshot {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_after: Option<Duration>,
}

impl BucketSnapshot {
    fn is_empty(&self) -> bool {
        self.limit.is_none() && self.remaining.is_none() && self.reset_after.is_none()
    }
}

/// The governor: bucket table plus the global lockout.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    buckets: DashMap<String, Arc<Bucket>>,
    global_until: Mutex<Option<Instant>>,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub(crate) fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            global_until: Mutex::new(None),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Get or lazily create the bucket for a key.
    pub(crate) fn bucket(&self, key: &str) -> Arc<Bucket> {
        self.maybe_sweep();

        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Bucket::new(key.to_string())))
            .clone()
    }

    /// Block until both the global lockout and the bucket's window permit
    /// egress. Must be called while holding the bucket's permit.
    pub(crate) async fn wait_until_ready(&self, bucket: &Bucket) {
        // Global lockout first: no request leaves while it is set.
        loop {
            let until = *self.global_until.lock();
            match until {
                Some(t) if t > Instant::now() => {
                    trace!(bucket = %bucket.key, "waiting out global lockout");
                    sleep_until(t).await;
                }
                _ => break,
            }
        }

        // Then the bucket window.
        if bucket.remaining() == 0 {
            if let Some(reset) = bucket.reset_at() {
                if reset > Instant::now() {
                    debug!(bucket = %bucket.key, "bucket exhausted, waiting for reset");
                    sleep_until(reset).await;
                }
            }

            // Window rolled over; restore the budget.
            let mut remaining = bucket.remaining.lock();
            if *remaining == 0 {
                *remaining = (*bucket.limit.lock()).max(1);
                *bucket.reset_at.lock() = None;
            }
        }
    }

    /// Fold response headers into the bucket state.
    pub(crate) fn record(&self, bucket: &Bucket, snapshot: BucketSnapshot) {
        *bucket.last_used.lock() = Instant::now();

        if snapshot.is_empty() {
            // No headers: assume the request consumed one slot.
            let mut remaining = bucket.remaining.lock();
            *remaining = remaining.saturating_sub(1);
            return;
        }

        if let Some(limit) = snapshot.limit {
            *bucket.limit.lock() = limit;
        }
        if let Some(remaining) = snapshot.remaining {
            *bucket.remaining.lock() = remaining;
        }
        if let Some(reset_after) = snapshot.reset_after {
            *bucket.reset_at.lock() = Some(Instant::now() + reset_after);
        }
    }

    /// Quiesce a single bucket for `retry_after` (bucket-scoped 429).
    pub(crate) fn delay_bucket(&self, bucket: &Bucket, retry_after: Duration) {
        *bucket.remaining.lock() = 0;
        *bucket.reset_at.lock() = Some(Instant::now() + retry_after);
    }

    /// Engage the process-wide lockout (429 with the global marker).
    pub(crate) fn lock_global(&self, retry_after: Duration) {
        warn!(retry_after_ms = retry_after.as_millis(), "global rate limit hit");
        let until = Instant::now() + retry_after;
        let mut global = self.global_until.lock();
        if global.map_or(true, |t| t < until) {
            *global = Some(until);
        }
    }

    /// Whether the global lockout is currently engaged.
    pub(crate) fn globally_locked(&self) -> bool {
        self.global_until
            .lock()
            .map_or(false, |t| t > Instant::now())
    }

    /// Number of live buckets, for diagnostics and tests.
    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Discard buckets that have sat idle past the TTL.
    fn maybe_sweep(&self) {
        {
            let mut last = self.last_sweep.lock();
            if last.elapsed() < SWEEP_INTERVAL {
                return;
            }
            *last = Instant::now();
        }

        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_idle());
        let removed = before - self.buckets.len();
        if removed > 0 {
            debug!(removed, "pruned idle rate-limit buckets");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn exhausted_bucket_waits_for_reset() {
        let limiter = RateLimiter::new();
        let bucket = limiter.bucket("PATCH /channels/123");

        limiter.record(
            &bucket,
            BucketSnapshot {
                limit: Some(1),
                remaining: Some(0),
                reset_after: Some(Duration::from_secs(1)),
            },
        );

        let _permit = bucket.admit().await.unwrap();
        let start = Instant::now();
        limiter.wait_until_ready(&bucket).await;
        assert!(start.elapsed() >= Duration::from_secs(1));

        // Budget restored after the roll-over.
        assert_eq!(bucket.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn bucket_with_budget_admits_immediately() {
        let limiter = RateLimiter::new();
        let bucket = limiter.bucket("GET /users/@me");

        limiter.record(
            &bucket,
            BucketSnapshot {
                limit: Some(5),
                remaining: Some(4),
                reset_after: Some(Duration::from_secs(2)),
            },
        );

        let start = Instant::now();
        limiter.wait_until_ready(&bucket).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn global_lockout_gates_every_bucket() {
        let limiter = RateLimiter::new();
        let a = limiter.bucket("GET /channels/1");
        let b = limiter.bucket("GET /channels/2");

        limiter.lock_global(Duration::from_secs(2));
        assert!(limiter.globally_locked());

        let start = Instant::now();
        limiter.wait_until_ready(&a).await;
        assert!(start.elapsed() >= Duration::from_secs(2));

        // Second bucket passes immediately once the lockout has elapsed.
        let start = Instant::now();
        limiter.wait_until_ready(&b).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(!limiter.globally_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_headers_decrement_optimistically() {
        let limiter = RateLimiter::new();
        let bucket = limiter.bucket("GET /gateway/bot");

        limiter.record(
            &bucket,
            BucketSnapshot {
                limit: Some(2),
                remaining: Some(2),
                reset_after: Some(Duration::from_secs(60)),
            },
        );
        limiter.record(&bucket, BucketSnapshot::default());
        assert_eq!(bucket.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn same_bucket_requests_serialize_one_per_window() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new());
        let bucket = limiter.bucket("PATCH /channels/123");
        let sent_at = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            let bucket = Arc::clone(&bucket);
            let sent_at = Arc::clone(&sent_at);
            handles.push(tokio::spawn(async move {
                let _permit = bucket.admit().await.unwrap();
                limiter.wait_until_ready(&bucket).await;
                sent_at.lock().push(Instant::now());
                // The server reports an exhausted window on every response.
                limiter.record(
                    &bucket,
                    BucketSnapshot {
                        limit: Some(1),
                        remaining: Some(0),
                        reset_after: Some(Duration::from_secs(1)),
                    },
                );
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // One request per window: consecutive sends are >= 1s apart.
        let sent_at = sent_at.lock();
        assert_eq!(sent_at.len(), 3);
        for pair in sent_at.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_buckets_are_independent() {
        let limiter = RateLimiter::new();
        let a = limiter.bucket("PATCH /channels/1");
        let b = limiter.bucket("PATCH /channels/2");

        limiter.delay_bucket(&a, Duration::from_secs(30));

        // b is untouched by a's delay
        let start = Instant::now();
        limiter.wait_until_ready(&b).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.bucket_count(), 2);
    }
}
