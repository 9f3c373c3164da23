//! Circuit breaker for provider failure protection.
//!
//! Guards the outbound provider call so a failing SMS vendor degrades into
//! fast local rejections instead of a pile-up of blocked dispatches.
//!
//! # Circuit Breaker State Machine
//!
//! ```text
//!                ┌─────────────────────────┐
//!                │         CLOSED          │
//!                │    (normal dispatch)    │
//!                └─────────────────────────┘
//!                 │                       ▲
//!     threshold   │                       │ trial success
//!     consecutive │                       │
//!     failures    ▼                       │
//!   ┌─────────────────────────┐         ┌─────────────────────────┐
//!   │          OPEN           │ cooldown│        HALF-OPEN        │
//!   │       (fail fast)       │────────▶│   (single trial call)   │
//!   └─────────────────────────┘ elapsed └─────────────────────────┘
//!                ▲                                 │
//!                └─────────────────────────────────┘
//!                          trial failure
//! ```
//!
//! Failure counting is a plain consecutive count: any recorded success
//! clears it. The cooldown timer is the only time-based element.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use fenix_core::{Clock, RealClock};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Consecutive failures required to trip the circuit open.
    pub failure_threshold: u32,
    /// Time to wait after tripping before a trial call is allowed.
    pub cooldown: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Current state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation, calls pass through.
    Closed,
    /// Provider unhealthy, calls fail immediately.
    Open,
    /// Testing recovery, a single trial call is allowed.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Point-in-time view of breaker state for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSnapshot {
    /// Current circuit state.
    pub state: CircuitState,
    /// Consecutive failures recorded since the last success.
    pub consecutive_failures: u32,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Circuit breaker for a single provider endpoint.
///
/// Shared by every dispatch worker targeting the provider. All state
/// transitions happen under one lock, so concurrent outcome reports cannot
/// lose a trip and only one caller can claim the half-open trial.
#[derive(Debug)]
pub struct CircuitBreaker {
    provider: String,
    config: CircuitConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    /// Creates a breaker for the named provider.
    pub fn new(provider: impl Into<String>, config: CircuitConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(RealClock))
    }

    /// Creates a breaker with an injected clock for deterministic tests.
    pub fn with_clock(
        provider: impl Into<String>,
        config: CircuitConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider: provider.into(),
            config,
            clock,
            inner: Mutex::new(CircuitInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Determines whether a call may proceed, claiming the trial slot when
    /// the breaker is half-open.
    ///
    /// An open breaker whose cooldown has elapsed moves to half-open inside
    /// the same critical section, so exactly one caller wins the trial and
    /// the rest keep failing fast until its outcome is recorded.
    pub async fn should_allow(&self) -> bool {
        let mut inner = self.inner.lock().await;

        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if self.clock.now().duration_since(opened_at) >= self.config.cooldown {
                    self.transition_to_half_open(&mut inner);
                }
            }
        }

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    false
                } else {
                    inner.trial_in_flight = true;
                    true
                }
            },
        }
    }

    /// Records a successful call outcome.
    ///
    /// Closes the circuit from half-open; in any state the consecutive
    /// failure count is cleared.
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            },
            CircuitState::Open => {
                // A call admitted before the trip finished after it.
                tracing::debug!(
                    provider = %self.provider,
                    "success recorded while circuit open"
                );
                inner.consecutive_failures = 0;
            },
            CircuitState::HalfOpen => {
                self.transition_to_closed(&mut inner);
            },
        }
    }

    /// Records a failed call outcome.
    ///
    /// Trips the circuit when the consecutive failure threshold is reached;
    /// a failed half-open trial re-opens it and restarts the cooldown.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        match inner.state {
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.transition_to_open(&mut inner);
                }
            },
            CircuitState::Open => {},
            CircuitState::HalfOpen => {
                self.transition_to_open(&mut inner);
            },
        }
    }

    /// Returns the current state without claiming the trial slot.
    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Returns a snapshot of the state and failure count.
    pub async fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.inner.lock().await;
        CircuitSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
        }
    }

    /// Forces the breaker into a specific state (for testing and manual
    /// recovery).
    pub async fn force_state(&self, state: CircuitState) {
        let mut inner = self.inner.lock().await;
        tracing::warn!(
            provider = %self.provider,
            from = %inner.state,
            to = %state,
            "forcing circuit breaker state"
        );

        inner.state = state;
        inner.trial_in_flight = false;
        match state {
            CircuitState::Open => {
                inner.opened_at = Some(self.clock.now());
            },
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                inner.opened_at = None;
            },
            CircuitState::HalfOpen => {},
        }
    }

    fn transition_to_open(&self, inner: &mut CircuitInner) {
        tracing::warn!(
            provider = %self.provider,
            consecutive_failures = inner.consecutive_failures,
            "circuit breaker opening"
        );
        inner.state = CircuitState::Open;
        inner.opened_at = Some(self.clock.now());
        inner.trial_in_flight = false;
    }

    fn transition_to_half_open(&self, inner: &mut CircuitInner) {
        tracing::info!(
            provider = %self.provider,
            "circuit breaker half-open, allowing trial call"
        );
        inner.state = CircuitState::HalfOpen;
        inner.trial_in_flight = false;
    }

    fn transition_to_closed(&self, inner: &mut CircuitInner) {
        tracing::info!(
            provider = %self.provider,
            "circuit breaker closed, provider recovered"
        );
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use fenix_core::TestClock;

    use super::*;

    fn test_config() -> CircuitConfig {
        CircuitConfig {
            failure_threshold: 3,
            cooldown: Duration::from_millis(100),
        }
    }

    fn test_breaker() -> (CircuitBreaker, TestClock) {
        let clock = TestClock::new();
        let breaker = CircuitBreaker::with_clock("aspsms", test_config(), Arc::new(clock.clone()));
        (breaker, clock)
    }

    async fn open_breaker(breaker: &CircuitBreaker) {
        for _ in 0..3 {
            breaker.record_failure().await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn circuit_starts_closed_and_allows_calls() {
        let (breaker, _clock) = test_breaker();

        assert_eq!(breaker.state().await, CircuitState::Closed);
        assert!(breaker.should_allow().await);
    }

    #[tokio::test]
    async fn threshold_consecutive_failures_open_circuit() {
        let (breaker, _clock) = test_breaker();

        breaker.record_failure().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
        assert!(breaker.should_allow().await);

        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Open);
        assert!(!breaker.should_allow().await);
    }

    #[tokio::test]
    async fn success_clears_failure_count() {
        let (breaker, _clock) = test_breaker();

        breaker.record_failure().await;
        breaker.record_failure().await;
        breaker.record_success().await;
        assert_eq!(breaker.snapshot().await.consecutive_failures, 0);

        // The count starts over, so two more failures do not trip it.
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn open_circuit_blocks_until_cooldown_elapses() {
        let (breaker, clock) = test_breaker();
        open_breaker(&breaker).await;

        clock.advance(Duration::from_millis(99));
        assert!(!breaker.should_allow().await);
        assert_eq!(breaker.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn cooldown_elapse_allows_exactly_one_trial() {
        let (breaker, clock) = test_breaker();
        open_breaker(&breaker).await;

        clock.advance(Duration::from_millis(100));
        assert!(breaker.should_allow().await);
        assert_eq!(breaker.state().await, CircuitState::HalfOpen);

        // The trial slot is claimed; further calls keep failing fast.
        assert!(!breaker.should_allow().await);
        assert!(!breaker.should_allow().await);
    }

    #[tokio::test]
    async fn trial_success_closes_circuit() {
        let (breaker, clock) = test_breaker();
        open_breaker(&breaker).await;

        clock.advance(Duration::from_millis(100));
        assert!(breaker.should_allow().await);
        breaker.record_success().await;

        let snapshot = breaker.snapshot().await;
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(breaker.should_allow().await);
    }

    #[tokio::test]
    async fn trial_failure_reopens_and_restarts_cooldown() {
        let (breaker, clock) = test_breaker();
        open_breaker(&breaker).await;

        clock.advance(Duration::from_millis(100));
        assert!(breaker.should_allow().await);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        // Cooldown restarted at the trial failure, not at the original trip.
        clock.advance(Duration::from_millis(99));
        assert!(!breaker.should_allow().await);

        clock.advance(Duration::from_millis(1));
        assert!(breaker.should_allow().await);
        assert_eq!(breaker.state().await, CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn trial_outcome_releases_slot_for_next_cooldown() {
        let (breaker, clock) = test_breaker();
        open_breaker(&breaker).await;

        clock.advance(Duration::from_millis(100));
        assert!(breaker.should_allow().await);
        breaker.record_failure().await;

        clock.advance(Duration::from_millis(100));
        assert!(breaker.should_allow().await);
        breaker.record_success().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn force_state_overrides_current_state() {
        let (breaker, _clock) = test_breaker();

        breaker.force_state(CircuitState::Open).await;
        assert!(!breaker.should_allow().await);

        breaker.force_state(CircuitState::Closed).await;
        assert!(breaker.should_allow().await);
        assert_eq!(breaker.snapshot().await.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn state_display_names() {
        assert_eq!(CircuitState::Closed.to_string(), "closed");
        assert_eq!(CircuitState::Open.to_string(), "open");
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
    }
}
