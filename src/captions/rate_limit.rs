//! Process-wide self-throttling toward the captions service.

use crate::config::RateLimitSettings;
use rand::Rng;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

/// Serializes captions requests and spaces them out.
///
/// Only one slot is handed out at a time. The next slot opens `min_interval`
/// after the previous one was released, plus a random jitter that grows with
/// the attempt number.
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
    jitter: Duration,
}

/// Permission to make one request. Releasing it stamps the request time.
pub struct SlotGuard<'a> {
    last_request: MutexGuard<'a, Option<Instant>>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        *self.last_request = Some(Instant::now());
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration, jitter: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
            jitter,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.min_interval_ms),
            Duration::from_millis(settings.jitter_ms),
        )
    }

    /// Wait until a request is permitted. `attempt` starts at 1.
    pub async fn acquire_slot(&self, attempt: u32) -> SlotGuard<'_> {
        let guard = self.last_request.lock().await;

        let interval_wait = match *guard {
            Some(last) => (last + self.min_interval).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        };
        let wait = interval_wait + self.jitter_for(attempt);

        if !wait.is_zero() {
            debug!(attempt, wait_ms = wait.as_millis() as u64, "Waiting for captions slot");
            tokio::time::sleep(wait).await;
        }

        SlotGuard { last_request: guard }
    }

    /// When the last slot was released.
    pub async fn last_request(&self) -> Option<Instant> {
        *self.last_request.lock().await
    }

    fn jitter_for(&self, attempt: u32) -> Duration {
        let max_ms = u64::try_from(self.jitter.as_millis())
            .unwrap_or(u64::MAX)
            .saturating_mul(u64::from(attempt.max(1)));
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_slot_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(30), Duration::ZERO);
        let start = Instant::now();
        drop(limiter.acquire_slot(1).await);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(limiter.last_request().await.is_some());
    }

    #[tokio::test]
    async fn test_enforces_min_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(150), Duration::ZERO);

        drop(limiter.acquire_slot(1).await);
        let released = limiter.last_request().await.unwrap();

        drop(limiter.acquire_slot(1).await);
        let second = limiter.last_request().await.unwrap();

        assert!(second.duration_since(released) >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_timestamp_updated_on_release() {
        let limiter = RateLimiter::new(Duration::ZERO, Duration::ZERO);

        let slot = limiter.acquire_slot(1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let before_release = Instant::now();
        drop(slot);

        assert!(limiter.last_request().await.unwrap() >= before_release);
    }

    #[test]
    fn test_jitter_scales_with_attempt() {
        let limiter = RateLimiter::new(Duration::ZERO, Duration::from_millis(10));
        for _ in 0..50 {
            assert!(limiter.jitter_for(1) <= Duration::from_millis(10));
            assert!(limiter.jitter_for(3) <= Duration::from_millis(30));
        }

        let quiet = RateLimiter::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(quiet.jitter_for(3), Duration::ZERO);
    }

    #[test]
    fn test_huge_jitter_saturates() {
        let limiter = RateLimiter::new(Duration::ZERO, Duration::from_millis(u64::MAX / 2));
        assert!(limiter.jitter_for(u32::MAX) <= Duration::from_millis(u64::MAX));
    }
}
