use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
pub(crate) struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub(crate) async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let oldest = match ts.front() {
                Some(&oldest) => oldest,
                None => continue,
            };
            let sleep_dur = (oldest + self.window).saturating_duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Yahoo API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }

    #[cfg(test)]
    async fn in_flight(&self) -> usize {
        self.timestamps.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_within_budget_does_not_wait() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let started = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.in_flight().await, 3);
    }

    #[tokio::test]
    async fn test_window_expiry_frees_slots() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        limiter.acquire().await;
        limiter.acquire().await;
        // The first timestamp aged out, so only the second remains
        assert_eq!(limiter.in_flight().await, 1);
    }

    #[test]
    fn test_zero_budget_is_clamped() {
        let limiter = RateLimiter::new(0, Duration::from_secs(1));
        assert_eq!(limiter.max_requests, 1);
    }
}
