// ============================================================================
// Token Bucket
// ============================================================================
//
// Process-wide admission control:
// - Bucket starts full with `burst_size` permits
// - A single background task adds one permit every 60s / requests_per_minute
// - Refills beyond capacity are dropped
// - try_acquire never waits
//
// Permits live in a tokio Semaphore. Request tasks only ever take permits
// (try_acquire + forget is one atomic check-and-decrement); the refill task is
// the only writer that adds them, so its "below capacity?" check cannot be
// invalidated upward between the check and the add.
// ============================================================================

use anyhow::Result;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::RateLimitConfig;

pub struct TokenBucket {
    permits: Arc<Semaphore>,
    capacity: usize,
    refill_period: Duration,
    refill_task: JoinHandle<()>,
}

impl TokenBucket {
    /// Create a full bucket and start its refill task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(requests_per_minute: u32, burst_size: u32) -> Result<Self> {
        if requests_per_minute == 0 {
            anyhow::bail!("requests_per_minute must be greater than zero");
        }
        if burst_size == 0 {
            anyhow::bail!("burst_size must be greater than zero");
        }

        let capacity = burst_size as usize;
        let refill_period = Duration::from_secs(60) / requests_per_minute;
        let permits = Arc::new(Semaphore::new(capacity));

        let refill_task = tokio::spawn(refill(Arc::downgrade(&permits), capacity, refill_period));

        tracing::info!(
            capacity = capacity,
            refill_period_ms = refill_period.as_millis() as u64,
            "Token bucket initialized"
        );

        Ok(Self {
            permits,
            capacity,
            refill_period,
            refill_task,
        })
    }

    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        Self::new(config.requests_per_minute, config.burst_size)
    }

    /// Take one permit if available. Never blocks.
    pub fn try_acquire(&self) -> bool {
        match self.permits.try_acquire() {
            Ok(permit) => {
                // Consumed permits are returned only by the refill task
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    /// Permits currently available
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Interval between refills; the earliest a rejected caller can expect capacity
    pub fn refill_period(&self) -> Duration {
        self.refill_period
    }
}

impl Drop for TokenBucket {
    fn drop(&mut self) {
        self.refill_task.abort();
    }
}

async fn refill(permits: Weak<Semaphore>, capacity: usize, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    // A stalled runtime must not produce a burst of catch-up refills
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(permits) = permits.upgrade() else {
            break;
        };
        if permits.available_permits() < capacity {
            permits.add_permits(1);
        }
    }

    tracing::debug!("Token bucket refill task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_reject() {
        let bucket = TokenBucket::new(60, 3).unwrap();

        for _ in 0..3 {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());
        assert_eq!(bucket.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refills_one_permit_per_period() {
        let bucket = TokenBucket::new(60, 2).unwrap();
        assert_eq!(bucket.refill_period(), Duration::from_secs(1));

        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());

        time::sleep(Duration::from_millis(1010)).await;
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_is_never_exceeded() {
        let bucket = TokenBucket::new(600, 4).unwrap();

        // Full bucket: refills during idle time must be dropped
        time::sleep(bucket.refill_period() * 20).await;
        assert_eq!(bucket.available(), 4);

        assert!(bucket.try_acquire());
        time::sleep(bucket.refill_period() * 20).await;
        assert_eq!(bucket.available(), 4);
        for _ in 0..4 {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquires_never_double_spend() {
        // One refill per minute: nothing is added during the test
        let bucket = Arc::new(TokenBucket::new(1, 50).unwrap());

        let mut handles = Vec::new();
        for _ in 0..200 {
            let bucket = bucket.clone();
            handles.push(tokio::spawn(async move { bucket.try_acquire() }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 50);
        assert_eq!(bucket.available(), 0);
    }

    #[tokio::test]
    async fn test_zero_configuration_is_rejected() {
        assert!(TokenBucket::new(0, 10).is_err());
        assert!(TokenBucket::new(10, 0).is_err());
    }
}
