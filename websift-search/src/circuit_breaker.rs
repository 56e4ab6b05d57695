//! Keyed circuit breaker.
//!
//! Tracks consecutive failures per key and temporarily disables keys that
//! fail repeatedly. The orchestrator keys it by [`Provider`] to skip a
//! provider that keeps failing; the content extractor keys it by host to
//! send a host straight to rendering after its lightweight fetches keep
//! failing. After a cooldown, a tripped key enters a half-open state where
//! a single probe determines whether to restore or re-trip the circuit.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └────────┘             └────┬─────┘
//!     │                         ▲                      │
//!     │  success                │  failure              │
//!     └─────────────────────────┴──────────────────────┘
//! ```
//!
//! [`Provider`]: crate::types::Provider

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Circuit state for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Healthy: all attempts are allowed through.
    Closed,
    /// Failed too many times: attempts are blocked until cooldown expires.
    Open,
    /// Cooldown has elapsed: one probe is allowed to test recovery.
    HalfOpen,
}

#[derive(Debug, Clone)]
struct Health {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
        }
    }
}

/// Thresholds for circuit breaker behaviour.
#[derive(Debug, Clone, Copy)]
pub struct BreakerPolicy {
    /// Consecutive failures before tripping the circuit to Open.
    pub failure_threshold: u32,
    /// Time to wait in Open state before transitioning to HalfOpen.
    pub cooldown: Duration,
}

/// Per-key circuit breaker, safe to share between tasks.
///
/// Locks are held only for the duration of a single map update and never
/// across an await point.
#[derive(Debug)]
pub struct CircuitBreaker<K> {
    policy: BreakerPolicy,
    keys: Mutex<HashMap<K, Health>>,
}

impl<K: Hash + Eq + Clone> CircuitBreaker<K> {
    /// Create a breaker with the given policy.
    pub fn new(policy: BreakerPolicy) -> Self {
        Self {
            policy,
            keys: Mutex::new(HashMap::new()),
        }
    }

    fn keys(&self) -> MutexGuard<'_, HashMap<K, Health>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a success, resetting the key to [`CircuitState::Closed`].
    pub fn record_success(&self, key: &K) {
        let mut keys = self.keys();
        let health = keys.entry(key.clone()).or_default();
        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
    }

    /// Record a failure. Trips to [`CircuitState::Open`] once the
    /// consecutive count reaches the threshold, or immediately when a
    /// half-open probe fails.
    pub fn record_failure(&self, key: &K) {
        let threshold = self.policy.failure_threshold.max(1);
        let mut keys = self.keys();
        let health = keys.entry(key.clone()).or_default();
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        health.last_failure_at = Some(Instant::now());

        if health.state == CircuitState::HalfOpen || health.consecutive_failures >= threshold {
            health.state = CircuitState::Open;
        }
    }

    /// Whether an attempt for `key` should be made now.
    ///
    /// - [`CircuitState::Closed`]: always `true`
    /// - [`CircuitState::Open`]: `true` only once the cooldown has elapsed
    ///   (transitions to [`CircuitState::HalfOpen`])
    /// - [`CircuitState::HalfOpen`]: `true` (probe allowed)
    pub fn should_attempt(&self, key: &K) -> bool {
        let mut keys = self.keys();
        let Some(health) = keys.get_mut(key) else {
            return true;
        };

        match health.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooldown_elapsed = health
                    .last_failure_at
                    .is_none_or(|t| t.elapsed() >= self.policy.cooldown);

                if cooldown_elapsed {
                    health.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Current state for `key`; unseen keys are Closed.
    pub fn state(&self, key: &K) -> CircuitState {
        self.keys()
            .get(key)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// Consecutive failures recorded for `key`.
    pub fn consecutive_failures(&self, key: &K) -> u32 {
        self.keys()
            .get(key)
            .map_or(0, |h| h.consecutive_failures)
    }

    /// Forget all tracked keys.
    pub fn reset(&self) {
        self.keys().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_breaker(threshold: u32, cooldown: Duration) -> CircuitBreaker<&'static str> {
        CircuitBreaker::new(BreakerPolicy {
            failure_threshold: threshold,
            cooldown,
        })
    }

    const LONG: Duration = Duration::from_secs(600);

    #[test]
    fn initial_state_is_closed() {
        let breaker = make_breaker(3, LONG);
        assert_eq!(breaker.state(&"bing"), CircuitState::Closed);
        assert!(breaker.should_attempt(&"bing"));
    }

    #[test]
    fn stays_closed_below_threshold() {
        let breaker = make_breaker(3, LONG);
        breaker.record_failure(&"brave");
        breaker.record_failure(&"brave");
        assert_eq!(breaker.state(&"brave"), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(&"brave"), 2);
    }

    #[test]
    fn open_blocks_attempts_until_cooldown() {
        let breaker = make_breaker(2, LONG);
        breaker.record_failure(&"example.com");
        breaker.record_failure(&"example.com");
        assert_eq!(breaker.state(&"example.com"), CircuitState::Open);
        assert!(!breaker.should_attempt(&"example.com"));
    }

    #[test]
    fn zero_cooldown_moves_to_half_open() {
        let breaker = make_breaker(1, Duration::ZERO);
        breaker.record_failure(&"bing");
        assert!(breaker.should_attempt(&"bing"));
        assert_eq!(breaker.state(&"bing"), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_success_restores_closed() {
        let breaker = make_breaker(3, Duration::ZERO);
        for _ in 0..3 {
            breaker.record_failure(&"ddg");
        }
        let _ = breaker.should_attempt(&"ddg");
        breaker.record_success(&"ddg");
        assert_eq!(breaker.state(&"ddg"), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(&"ddg"), 0);
    }

    #[test]
    fn half_open_failure_retrips_immediately() {
        let breaker = make_breaker(3, Duration::ZERO);
        for _ in 0..3 {
            breaker.record_failure(&"ddg");
        }
        let _ = breaker.should_attempt(&"ddg");
        breaker.record_success(&"ddg");
        for _ in 0..3 {
            breaker.record_failure(&"ddg");
        }
        let _ = breaker.should_attempt(&"ddg");
        assert_eq!(breaker.state(&"ddg"), CircuitState::HalfOpen);
        breaker.record_failure(&"ddg");
        assert_eq!(breaker.state(&"ddg"), CircuitState::Open);
    }

    #[test]
    fn alternating_success_never_trips() {
        let breaker = make_breaker(2, LONG);
        for _ in 0..10 {
            breaker.record_failure(&"a.com");
            breaker.record_success(&"a.com");
        }
        assert_eq!(breaker.state(&"a.com"), CircuitState::Closed);
    }

    #[test]
    fn keys_are_independent() {
        let breaker = make_breaker(1, LONG);
        breaker.record_failure(&"a.com");
        assert!(!breaker.should_attempt(&"a.com"));
        assert!(breaker.should_attempt(&"b.com"));
    }

    #[test]
    fn reset_clears_all_state() {
        let breaker = make_breaker(1, LONG);
        breaker.record_failure(&"a.com");
        breaker.reset();
        assert_eq!(breaker.state(&"a.com"), CircuitState::Closed);
    }

    #[test]
    fn breaker_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CircuitBreaker<String>>();
    }
}
