//! # Circuit Breaker Module
//!
//! Fail-fast protection for calls to the clinic backend. When the backend
//! fails repeatedly, calls are refused locally for a while instead of piling
//! up behind request timeouts.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::BreakerConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker for backend operations
///
/// # State Machine
///
/// - **Closed**: normal operation, calls pass through
/// - **Open**: `failure_threshold` consecutive failures seen, calls fail fast
/// - **Half-Open**: reset window elapsed, the next call is let through and
///   its outcome closes or re-opens the breaker
///
/// The breaker never retries anything itself.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: BreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// ```rust
    /// use clinic_bot::breaker::CircuitBreaker;
    /// use clinic_bot::config::BreakerConfig;
    ///
    /// let breaker = CircuitBreaker::new(BreakerConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    /// `true` while calls should be refused.
    ///
    /// Once the reset window has elapsed the breaker reports closed again and
    /// keeps the failure count, so a single further failure re-opens it.
    pub fn is_open(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.failure_count < self.config.failure_threshold {
            return false;
        }
        match state.last_failure {
            Some(last) => last.elapsed() < Duration::from_secs(self.config.reset_secs),
            None => false,
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure = Some(Instant::now());
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .failure_count
    }
}
