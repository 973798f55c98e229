use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Fixed-window limiter keyed by client IP.
pub struct RateLimiter {
    /// Map from IP to (window start, attempts in window)
    attempts: DashMap<IpAddr, (Instant, u32)>,
    max_attempts: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            attempts: DashMap::new(),
            max_attempts,
            window,
        }
    }

    /// Count an attempt from `ip`.
    /// Returns Err(time until the window resets) once the limit is reached.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), Duration> {
        let mut entry = self.attempts.entry(ip).or_insert((now, 0));
        let (window_start, count) = entry.value_mut();

        if now.duration_since(*window_start) >= self.window {
            *window_start = now;
            *count = 0;
        }

        if *count >= self.max_attempts {
            return Err(self.window - now.duration_since(*window_start));
        }

        *count += 1;
        Ok(())
    }

    /// Drop windows that ended; run periodically.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts
            .retain(|_, (window_start, _)| now.duration_since(*window_start) < self.window);
    }

    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }
}

/// Limiter for `/accounts/authenticate`.
pub fn login_limiter(attempts_per_minute: u32) -> RateLimiter {
    RateLimiter::new(attempts_per_minute, Duration::from_secs(60))
}
