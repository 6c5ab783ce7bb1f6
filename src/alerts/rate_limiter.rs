use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Sliding-window limiter for crash notifications
///
/// A burst of panics (several worker threads dying together) should surface
/// a handful of notifications, not one per thread.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    /// Send times still inside the window
    sent: VecDeque<DateTime<Utc>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_minute(3)
    }
}

impl RateLimiter {
    /// Allow `max_per_minute` notifications in any one-minute window
    pub fn per_minute(max_per_minute: usize) -> Self {
        Self::new(max_per_minute, Duration::minutes(1))
    }

    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            sent: VecDeque::new(),
        }
    }

    /// Claim a slot now if one is free
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Utc::now())
    }

    /// Claim a slot at `now` if one is free
    ///
    /// Returns `false` without recording anything when the window is full.
    pub fn try_acquire_at(&mut self, now: DateTime<Utc>) -> bool {
        self.expire(now);
        if self.sent.len() >= self.max_per_window {
            return false;
        }
        self.sent.push_back(now);
        true
    }

    /// Give back the most recent slot (the send it was claimed for failed)
    pub fn release_last(&mut self) {
        self.sent.pop_back();
    }

    /// Slots in use at `now`
    pub fn in_use_at(&mut self, now: DateTime<Utc>) -> usize {
        self.expire(now);
        self.sent.len()
    }

    fn expire(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.sent.retain(|&time| time > cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let mut limiter = RateLimiter::per_minute(3);
        let now = Utc::now();

        assert!(limiter.try_acquire_at(now));
        assert!(limiter.try_acquire_at(now));
        assert!(limiter.try_acquire_at(now));
        assert!(!limiter.try_acquire_at(now));
        assert_eq!(limiter.in_use_at(now), 3);
    }

    #[test]
    fn test_window_slides() {
        let mut limiter = RateLimiter::per_minute(2);
        let start = Utc::now();

        assert!(limiter.try_acquire_at(start));
        assert!(limiter.try_acquire_at(start + Duration::seconds(30)));
        assert!(!limiter.try_acquire_at(start + Duration::seconds(45)));

        // First slot expires after a minute
        assert!(limiter.try_acquire_at(start + Duration::seconds(61)));
        assert_eq!(limiter.in_use_at(start + Duration::seconds(61)), 2);
    }

    #[test]
    fn test_rejected_attempts_are_not_recorded() {
        let mut limiter = RateLimiter::per_minute(1);
        let start = Utc::now();

        assert!(limiter.try_acquire_at(start));
        for i in 1..10 {
            assert!(!limiter.try_acquire_at(start + Duration::seconds(i)));
        }
        assert!(limiter.try_acquire_at(start + Duration::seconds(61)));
    }

    #[test]
    fn test_release_last() {
        let mut limiter = RateLimiter::per_minute(1);
        let now = Utc::now();

        assert!(limiter.try_acquire_at(now));
        limiter.release_last();
        assert_eq!(limiter.in_use_at(now), 0);
        assert!(limiter.try_acquire_at(now));
    }

    #[test]
    fn test_custom_window() {
        let mut limiter = RateLimiter::new(1, Duration::seconds(5));
        let now = Utc::now();

        assert!(limiter.try_acquire_at(now));
        assert!(!limiter.try_acquire_at(now + Duration::seconds(4)));
        assert!(limiter.try_acquire_at(now + Duration::seconds(6)));
    }
}
