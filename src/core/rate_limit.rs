use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window limiter keyed by an arbitrary string
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: DashMap::new(),
        }
    }

    /// Record a request for `key`. Returns false when the key is over its limit.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        // Drop keys whose window has fully elapsed
        self.hits.retain(|_, hits| {
            while let Some(oldest) = hits.front() {
                if now.duration_since(*oldest) >= self.window {
                    hits.pop_front();
                } else {
                    break;
                }
            }
            !hits.is_empty()
        });

        let mut entry = self.hits.entry(key.to_string()).or_default();

        if entry.len() >= self.max_requests {
            return false;
        }
        entry.push_back(now);
        true
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_per_key() {
        let limiter = RateLimiter::new(3, Duration::from_secs(900));
        let now = Instant::now();
        assert!(limiter.check_at("a@example.com", now));
        assert!(limiter.check_at("a@example.com", now));
        assert!(limiter.check_at("a@example.com", now));
        assert!(!limiter.check_at("a@example.com", now));
        assert!(limiter.check_at("b@example.com", now));
    }

    #[test]
    fn test_window_expires() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at("k", start));
        assert!(!limiter.check_at("k", start + Duration::from_secs(59)));
        assert!(limiter.check_at("k", start + Duration::from_secs(60)));
    }

    #[test]
    fn test_expired_keys_are_dropped() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for i in 0..5 {
            assert!(limiter.check_at(&format!("user{}@example.com", i), start));
        }
        assert_eq!(limiter.tracked_keys(), 5);

        assert!(limiter.check_at("late@example.com", start + Duration::from_secs(61)));
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
