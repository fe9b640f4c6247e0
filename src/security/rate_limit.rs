//! Fixed-window rate limiting keyed by client identifier.
//!
//! Each identifier owns a counter and an absolute reset time. The first request
//! (or the first one after `reset_at`) opens a fresh window with `count = 1`.
//! Requests inside the window are admitted while `count < max_requests`;
//! rejected requests do not increment the counter.
//!
//! Fixed windows admit up to `2 * max_requests` across a window boundary. That
//! burst is accepted here; this is abuse prevention, not quota billing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;

/// Immutable `(max_requests, window)` pair selected per endpoint at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window }
    }

    fn reset_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.window)
            .ok()
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub admitted: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, rounded up, never below 1.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000).max(1)
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Process-local fixed-window limiter.
///
/// Cheap to clone; clones share the same table. The per-entry shard lock held
/// by `DashMap::entry` makes check-and-increment atomic per identifier.
#[derive(Clone, Default)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, WindowEntry>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and record a request against the wall clock.
    pub fn check(&self, identifier: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        self.check_at(identifier, policy, Utc::now())
    }

    /// Check and record a request as of `now`.
    pub fn check_at(
        &self,
        identifier: &str,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let fresh = || WindowEntry {
            count: 1,
            reset_at: policy.reset_from(now),
        };

        let mut entry = self
            .entries
            .entry(identifier.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                reset_at: now,
            });
        let window = entry.value_mut();

        if window.count == 0 || now > window.reset_at {
            *window = fresh();
            return RateLimitDecision {
                admitted: true,
                limit: policy.max_requests,
                remaining: policy.max_requests.saturating_sub(1),
                reset_at: window.reset_at,
            };
        }

        if window.count < policy.max_requests {
            window.count += 1;
            RateLimitDecision {
                admitted: true,
                limit: policy.max_requests,
                remaining: policy.max_requests - window.count,
                reset_at: window.reset_at,
            }
        } else {
            RateLimitDecision {
                admitted: false,
                limit: policy.max_requests,
                remaining: 0,
                reset_at: window.reset_at,
            }
        }
    }

    /// Drop entries whose window has elapsed. Returns how many were removed.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, window| now <= window.reset_at);
        before.saturating_sub(self.entries.len())
    }

    /// Number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periodically sweep expired entries until shutdown is signalled.
    pub async fn run_sweeper(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = interval.as_secs(), "Rate limit sweeper starting");

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep_at(Utc::now());
                    metrics::record_rate_limit_entries(self.len());
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.len(), "Swept expired rate limit entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_PER_MINUTE: RateLimitPolicy = RateLimitPolicy::new(5, Duration::from_secs(60));

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_admits_n_then_rejects() {
        let limiter = RateLimiter::new();
        let now = t0();

        for i in 0..5 {
            let d = limiter.check_at("1.2.3.4", &FIVE_PER_MINUTE, now);
            assert!(d.admitted, "request {} should be admitted", i + 1);
            assert_eq!(d.remaining, 4 - i);
            assert_eq!(d.limit, 5);
        }

        let rejected = limiter.check_at("1.2.3.4", &FIVE_PER_MINUTE, now + chrono::Duration::seconds(10));
        assert!(!rejected.admitted);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.reset_at, now + chrono::Duration::seconds(60));
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::new(1, Duration::from_secs(60));
        let now = t0();

        limiter.check_at("a", &policy, now);
        for s in 1..5 {
            let d = limiter.check_at("a", &policy, now + chrono::Duration::seconds(s));
            assert!(!d.admitted);
            assert_eq!(d.reset_at, now + chrono::Duration::seconds(60));
        }
    }

    #[test]
    fn test_window_elapse_resets_count() {
        let limiter = RateLimiter::new();
        let now = t0();

        for _ in 0..6 {
            limiter.check_at("1.2.3.4", &FIVE_PER_MINUTE, now);
        }

        // Exactly at reset_at the old window still applies.
        let at_reset = now + chrono::Duration::seconds(60);
        assert!(!limiter.check_at("1.2.3.4", &FIVE_PER_MINUTE, at_reset).admitted);

        let later = at_reset + chrono::Duration::milliseconds(1);
        let d = limiter.check_at("1.2.3.4", &FIVE_PER_MINUTE, later);
        assert!(d.admitted);
        assert_eq!(d.remaining, 4, "fresh window starts at count=1");
        assert_eq!(d.reset_at, later + chrono::Duration::seconds(60));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::new(2, Duration::from_secs(60));
        let now = t0();

        limiter.check_at("a", &policy, now);
        limiter.check_at("a", &policy, now);
        assert!(!limiter.check_at("a", &policy, now).admitted);

        let b = limiter.check_at("b", &policy, now);
        assert!(b.admitted);
        assert_eq!(b.remaining, 1);
    }

    #[test]
    fn test_sweep_only_removes_expired() {
        let limiter = RateLimiter::new();
        let now = t0();
        limiter.check_at("old", &RateLimitPolicy::new(1, Duration::from_secs(10)), now);
        limiter.check_at("new", &RateLimitPolicy::new(1, Duration::from_secs(600)), now);

        let removed = limiter.sweep_at(now + chrono::Duration::seconds(30));
        assert_eq!(removed, 1);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let now = t0();
        let decision = RateLimitDecision {
            admitted: false,
            limit: 1,
            remaining: 0,
            reset_at: now + chrono::Duration::milliseconds(1500),
        };
        assert_eq!(decision.retry_after_secs(now), 2);
        assert_eq!(decision.retry_after_secs(now + chrono::Duration::seconds(5)), 1);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::new(1000, Duration::from_secs(3600));
        let now = t0();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|_| limiter.check_at("shared", &policy, now).admitted)
                        .count()
                })
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(admitted, 800);
        assert_eq!(limiter.check_at("shared", &policy, now).remaining, 1000 - 801);
    }
}
