/// Rate limiting for the upload endpoints
/// Fixed one-minute windows, per client IP and per user id

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::api::errors::ApiError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub per_ip_per_window: u32,
    pub per_user_per_window: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            per_ip_per_window: 10,
            per_user_per_window: 5,
            window: Duration::from_secs(60),
        }
    }
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitEntry {
    fn new(now: Instant) -> Self {
        RateLimitEntry {
            count: 0,
            window_start: now,
        }
    }
}

#[derive(Default)]
struct Windows {
    ip: HashMap<String, RateLimitEntry>,
    user: HashMap<String, RateLimitEntry>,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiter {
            config,
            windows: Mutex::new(Windows::default()),
        }
    }

    /// Count a request against the IP window and, when given, the user
    /// window. A rejected request is not counted.
    pub fn check_rate_limit(&self, ip: &str, user_id: Option<&str>) -> Result<(), RateLimitError> {
        self.check_at(ip, user_id, Instant::now())
    }

    fn check_at(&self, ip: &str, user_id: Option<&str>, now: Instant) -> Result<(), RateLimitError> {
        let mut windows = self.lock();
        let Windows { ip: ips, user: users } = &mut *windows;

        let ip_entry = ips
            .entry(ip.to_string())
            .or_insert_with(|| RateLimitEntry::new(now));
        self.roll(ip_entry, now);
        if ip_entry.count >= self.config.per_ip_per_window {
            return Err(self.exceeded(RateLimitScope::Ip, self.config.per_ip_per_window, ip_entry, now));
        }

        if let Some(user_id) = user_id {
            let user_entry = users
                .entry(user_id.to_string())
                .or_insert_with(|| RateLimitEntry::new(now));
            self.roll(user_entry, now);
            if user_entry.count >= self.config.per_user_per_window {
                return Err(self.exceeded(
                    RateLimitScope::User,
                    self.config.per_user_per_window,
                    user_entry,
                    now,
                ));
            }
            user_entry.count += 1;
        }

        ip_entry.count += 1;
        Ok(())
    }

    fn roll(&self, entry: &mut RateLimitEntry, now: Instant) {
        if now.duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }
    }

    fn exceeded(
        &self,
        scope: RateLimitScope,
        limit: u32,
        entry: &RateLimitEntry,
        now: Instant,
    ) -> RateLimitError {
        let remaining = self
            .config
            .window
            .saturating_sub(now.duration_since(entry.window_start));
        RateLimitError {
            scope,
            limit,
            window_seconds: self.config.window.as_secs(),
            // round up so clients never retry early
            retry_after: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
        }
    }

    /// Drop windows that have expired (call periodically)
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let window = self.config.window;
        let mut windows = self.lock();
        windows
            .ip
            .retain(|_, entry| now.duration_since(entry.window_start) < window);
        windows
            .user
            .retain(|_, entry| now.duration_since(entry.window_start) < window);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        let windows = self.lock();
        windows.ip.len() + windows.user.len()
    }

    fn lock(&self) -> MutexGuard<'_, Windows> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    Ip,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitError {
    pub scope: RateLimitScope,
    pub limit: u32,
    pub window_seconds: u64,
    pub retry_after: u64,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scope {
            RateLimitScope::Ip => write!(f, "IP rate limit exceeded ({} per {}s)", self.limit, self.window_seconds),
            RateLimitScope::User => write!(f, "User rate limit exceeded ({} per {}s)", self.limit, self.window_seconds),
        }
    }
}

impl std::error::Error for RateLimitError {}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        ApiError::rate_limit_exceeded(err.limit, err.window_seconds, err.retry_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_rate_limit() {
        let config = RateLimitConfig {
            per_ip_per_window: 3,
            ..Default::default()
        };
        let limiter = RateLimiter::new(config);
        let start = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("192.168.1.1", None, start).is_ok());
        }

        let err = limiter.check_at("192.168.1.1", None, start).unwrap_err();
        assert_eq!(err.scope, RateLimitScope::Ip);
        assert_eq!(err.retry_after, 60);

        // Other clients are unaffected
        assert!(limiter.check_at("192.168.1.2", None, start).is_ok());

        // A new window starts after a minute
        let later = start + Duration::from_secs(60);
        assert!(limiter.check_at("192.168.1.1", None, later).is_ok());
    }

    #[test]
    fn test_user_rate_limit() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let now = Instant::now();
        let user = "did:privy:test123";

        for i in 0..5 {
            let ip = format!("10.0.0.{i}");
            assert!(limiter.check_at(&ip, Some(user), now).is_ok());
        }

        let err = limiter.check_at("10.0.0.9", Some(user), now).unwrap_err();
        assert_eq!(err.scope, RateLimitScope::User);
        assert_eq!(err.limit, 5);
    }

    #[test]
    fn test_rejection_maps_to_429() {
        let err = RateLimitError {
            scope: RateLimitScope::Ip,
            limit: 10,
            window_seconds: 60,
            retry_after: 42,
        };
        let api: ApiError = err.into();
        assert_eq!(api.code, 429);
        let details = api.details.unwrap();
        assert_eq!(details["limit"], 10);
        assert_eq!(details["window_seconds"], 60);
        assert_eq!(details["retry_after"], 42);
    }

    #[test]
    fn test_cleanup_expired() {
        let limiter = RateLimiter::new(RateLimitConfig::default());

        limiter.check_rate_limit("192.168.1.1", Some("u1")).ok();
        limiter.check_rate_limit("192.168.1.2", None).ok();

        assert_eq!(limiter.tracked(), 3);

        limiter.cleanup_expired();

        // Entries are recent, should not be cleaned up yet
        assert_eq!(limiter.tracked(), 3);
    }
}
