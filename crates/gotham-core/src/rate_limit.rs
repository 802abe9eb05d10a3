//! Sliding-window limiter for outbound vendor calls.
//!
//! `acquire` never rejects; it only delays. The usage window lives behind a
//! FIFO-fair `tokio::sync::Mutex` that is held across the wait, so blocked
//! callers are admitted one at a time in arrival order.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    usage: Mutex<VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    /// A `max_requests` of zero is treated as one so `acquire` cannot stall forever.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            usage: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for a free slot, then record its use.
    pub async fn acquire(&self) {
        let mut usage = self.usage.lock().await;
        loop {
            let now = Instant::now();
            evict(&mut usage, now, self.window);

            if usage.len() < self.max_requests {
                usage.push_back(now);
                return;
            }

            let Some(&oldest) = usage.front() else {
                continue;
            };
            let wait = (oldest + self.window).saturating_duration_since(now);
            debug!(
                wait_ms = wait.as_millis() as u64,
                in_window = usage.len(),
                "rate limit reached, waiting for a slot"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of recorded calls still inside the window.
    pub async fn in_window(&self) -> usize {
        let mut usage = self.usage.lock().await;
        evict(&mut usage, Instant::now(), self.window);
        usage.len()
    }
}

fn evict(usage: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = usage.front() {
        if now.saturating_duration_since(front) >= window {
            usage.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn calls_under_the_limit_are_not_delayed() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_window().await, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn eleventh_call_waits_for_the_window() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        let start = Instant::now();
        let mut admitted = Vec::new();
        for _ in 0..15 {
            limiter.acquire().await;
            admitted.push(start.elapsed());
        }

        assert_eq!(admitted.len(), 15, "no call is dropped");
        for at in &admitted[..10] {
            assert_eq!(*at, Duration::ZERO);
        }
        for at in &admitted[10..] {
            assert!(*at >= Duration::from_secs(60), "admitted too early: {at:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn wait_is_measured_from_the_oldest_entry() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(4)).await;
        limiter.acquire().await;

        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        // The entry from t=4 is still inside the window.
        assert_eq!(limiter.in_window().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_never_over_admitted() {
        let limiter = Arc::new(RateLimiter::new(3, Duration::from_secs(30)));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                start.elapsed()
            }));
        }
        let mut times = Vec::new();
        for h in handles {
            times.push(h.await.unwrap());
        }
        times.sort();
        assert_eq!(times.iter().filter(|t| **t < Duration::from_secs(30)).count(), 3);
        assert!(times[3..].iter().all(|t| *t >= Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_waiter_records_nothing() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.acquire().await;
        let waited =
            tokio::time::timeout(Duration::from_secs(5), limiter.acquire()).await;
        assert!(waited.is_err());
        assert_eq!(limiter.in_window().await, 1);
    }

    #[test]
    fn zero_limit_is_clamped() {
        let limiter = RateLimiter::new(0, Duration::from_secs(1));
        assert_eq!(limiter.max_requests(), 1);
    }
}
