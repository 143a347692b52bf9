//! Sliding-window rate limiter.
//!
//! Each key (a tool name) owns an ordered window of request timestamps. A
//! check evicts timestamps older than the window, denies when the remaining
//! count has reached the limit and otherwise records the current instant.
//! The evict-count-record sequence runs under the key's entry lock, so two
//! concurrent callers can never both take the last slot.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Default number of requests admitted per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 60;

/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;

/// A request budget: `max_requests` per `window_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Requests admitted per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
}

impl RateLimitPolicy {
    /// Create a policy.
    pub const fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECONDS)
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Whole seconds until a slot frees up (at least 1). `None` when allowed.
    pub retry_after_seconds: Option<u64>,
}

impl RateDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_seconds: None,
        }
    }

    fn deny(retry_after_seconds: u64) -> Self {
        Self {
            allowed: false,
            retry_after_seconds: Some(retry_after_seconds),
        }
    }
}

/// Per-key sliding-window admission control.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    defaults: RateLimitPolicy,
}

impl RateLimiter {
    /// Create a limiter whose zero-valued limits fall back to `defaults`.
    pub fn new(defaults: RateLimitPolicy) -> Self {
        Self {
            windows: DashMap::new(),
            defaults,
        }
    }

    /// The fallback policy.
    pub fn defaults(&self) -> RateLimitPolicy {
        self.defaults
    }

    /// Check and, when admitted, record a request for `key` at the current instant.
    pub fn check(&self, key: &str, max_requests: u32, window_seconds: u64) -> RateDecision {
        self.check_at(key, max_requests, window_seconds, Instant::now())
    }

    /// Check against a policy.
    pub fn check_policy(&self, key: &str, policy: RateLimitPolicy) -> RateDecision {
        self.check(key, policy.max_requests, policy.window_seconds)
    }

    /// Check and record a request for `key` at `now`.
    pub fn check_at(
        &self,
        key: &str,
        max_requests: u32,
        window_seconds: u64,
        now: Instant,
    ) -> RateDecision {
        let max_requests = if max_requests == 0 {
            self.defaults.max_requests
        } else {
            max_requests
        };
        let window = Duration::from_secs(if window_seconds == 0 {
            self.defaults.window_seconds
        } else {
            window_seconds
        });

        // The entry guard holds the shard lock until the end of this scope.
        let mut timestamps = self.windows.entry(key.to_string()).or_default();

        if let Some(cutoff) = now.checked_sub(window) {
            while timestamps.front().is_some_and(|&t| t < cutoff) {
                timestamps.pop_front();
            }
        }

        if timestamps.len() >= max_requests as usize {
            let oldest = timestamps.front().copied().unwrap_or(now);
            let remaining = (oldest + window).saturating_duration_since(now);
            let mut secs = remaining.as_secs();
            if remaining.subsec_nanos() > 0 {
                secs += 1;
            }
            return RateDecision::deny(secs.max(1));
        }

        timestamps.push_back(now);
        RateDecision::allow()
    }

    /// Clear the window for one key, or for every key when `key` is `None`.
    pub fn reset(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.windows.remove(key);
            }
            None => self.windows.clear(),
        }
    }

    /// Number of timestamps currently retained for `key`.
    #[cfg(test)]
    fn tracked(&self, key: &str) -> usize {
        self.windows.get(key).map(|w| w.len()).unwrap_or(0)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

/// Human-readable denial message.
pub fn denial_message(key: &str, policy: RateLimitPolicy, retry_after_seconds: u64) -> String {
    format!(
        "Rate limit exceeded for '{}'. Max {} requests per {}s. Retry after {}s.",
        key, policy.max_requests, policy.window_seconds, retry_after_seconds
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_allows_within_window() {
        let limiter = RateLimiter::default();
        for _ in 0..10 {
            assert!(limiter.check("test_tool", 10, 60).allowed);
        }
    }

    #[test]
    fn test_blocks_over_window() {
        let limiter = RateLimiter::default();
        let now = Instant::now();
        for _ in 0..60 {
            assert!(limiter.check_at("test_tool", 60, 60, now).allowed);
        }
        let decision = limiter.check_at("test_tool", 60, 60, now);
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after_seconds, Some(60));
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let limiter = RateLimiter::default();
        let start = Instant::now();
        limiter.check_at("k", 1, 10, start);
        let decision = limiter.check_at("k", 1, 10, start + Duration::from_millis(2_500));
        // 7.5 seconds left rounds up to 8
        assert_eq!(decision.retry_after_seconds, Some(8));
    }

    #[test]
    fn test_retry_after_minimum_one() {
        let limiter = RateLimiter::default();
        let start = Instant::now();
        limiter.check_at("k", 1, 10, start);
        let decision = limiter.check_at("k", 1, 10, start + Duration::from_secs(10));
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after_seconds, Some(1));
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::default();
        let start = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at("k", 3, 60, start).allowed);
        }
        assert!(!limiter.check_at("k", 3, 60, start + Duration::from_secs(30)).allowed);
        // Past the window, the old timestamps are evicted
        assert!(limiter.check_at("k", 3, 60, start + Duration::from_secs(61)).allowed);
        assert_eq!(limiter.tracked("k"), 1);
    }

    #[test]
    fn test_per_key_isolation() {
        let limiter = RateLimiter::default();
        for _ in 0..5 {
            limiter.check("tool_a", 5, 60);
        }
        assert!(!limiter.check("tool_a", 5, 60).allowed);
        assert!(limiter.check("tool_b", 5, 60).allowed);
    }

    #[test]
    fn test_reset_single_key() {
        let limiter = RateLimiter::default();
        for _ in 0..5 {
            limiter.check("tool_c", 5, 60);
            limiter.check("tool_d", 5, 60);
        }
        assert!(!limiter.check("tool_c", 5, 60).allowed);

        limiter.reset(Some("tool_c"));

        assert!(limiter.check("tool_c", 5, 60).allowed);
        assert!(!limiter.check("tool_d", 5, 60).allowed);
    }

    #[test]
    fn test_debug_lists_windows() {
        let limiter = RateLimiter::default();
        limiter.check("tool_e", 5, 60);
        let rendered = format!("{limiter:?}");
        assert!(rendered.contains("RateLimiter"));
        assert!(rendered.contains("tool_e"));
    }

    #[test]
    fn test_reset_all() {
        let limiter = RateLimiter::default();
        for _ in 0..2 {
            limiter.check("a", 2, 60);
            limiter.check("b", 2, 60);
        }
        limiter.reset(None);
        assert!(limiter.check("a", 2, 60).allowed);
        assert!(limiter.check("b", 2, 60).allowed);
    }

    #[test]
    fn test_zero_limits_use_defaults() {
        let limiter = RateLimiter::new(RateLimitPolicy::new(2, 60));
        let now = Instant::now();
        assert!(limiter.check_at("k", 0, 0, now).allowed);
        assert!(limiter.check_at("k", 0, 0, now).allowed);
        assert!(!limiter.check_at("k", 0, 0, now).allowed);
    }

    #[test]
    fn test_denial_message() {
        let msg = denial_message("tool_d", RateLimitPolicy::new(3, 60), 42);
        assert!(msg.contains("Rate limit exceeded"));
        assert!(msg.contains("Retry after 42s"));
    }

    #[test]
    fn test_concurrent_callers_share_one_budget() {
        let limiter = Arc::new(RateLimiter::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| limiter.check("shared", 100, 60).allowed)
                        .count()
                })
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
    }

    proptest! {
        #[test]
        fn prop_exactly_n_admitted_per_window(max in 1u32..40, extra in 1usize..40) {
            let limiter = RateLimiter::default();
            let now = Instant::now();
            let admitted = (0..max as usize + extra)
                .filter(|_| limiter.check_at("k", max, 60, now).allowed)
                .count();
            prop_assert_eq!(admitted, max as usize);

            let denied = limiter.check_at("k", max, 60, now);
            prop_assert!(!denied.allowed);
            prop_assert!(denied.retry_after_seconds.unwrap() >= 1);
        }
    }
}
