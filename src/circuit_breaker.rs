//! Circuit Breaker
//!
//! Stops hammering a source that keeps failing. While open, the transport
//! rejects the call immediately and the adapter reports an empty page for
//! that source instead of waiting on a dead upstream.
//! States: Closed -> Open -> HalfOpen -> Closed

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::schemas::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    /// A single probe request is allowed through
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    trips: u64,
}

/// Circuit breaker guarding one source
pub struct CircuitBreaker {
    source: SourceKind,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(source: SourceKind, config: CircuitBreakerConfig) -> Self {
        Self {
            source,
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
                trips: 0,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn trips(&self) -> u64 {
        self.inner.lock().trips
    }

    /// Whether a request may go out right now
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.open_duration)
                    .unwrap_or(true);
                if cooled_down {
                    info!(source = %self.source, "Circuit half-open, sending probe");
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    true
                } else {
                    debug!(source = %self.source, "Circuit open, request blocked");
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            info!(source = %self.source, "Circuit closed after successful probe");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures += 1;
        inner.probe_in_flight = false;

        let should_open = match inner.state {
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if should_open {
            warn!(
                source = %self.source,
                failures = inner.consecutive_failures,
                open_duration_secs = self.config.open_duration.as_secs(),
                "Circuit opened"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.trips += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, open_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            SourceKind::Archive,
            CircuitBreakerConfig {
                failure_threshold: threshold,
                open_duration: Duration::from_millis(open_ms),
            },
        )
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = breaker(3, 1_000);
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow_request());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
        assert_eq!(cb.trips(), 1);
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let cb = breaker(2, 1_000);
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_single_probe_then_recover() {
        let cb = breaker(1, 10);
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(20));

        assert!(cb.allow_request());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(!cb.allow_request());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow_request());
    }

    #[test]
    fn test_failed_probe_reopens() {
        let cb = breaker(1, 10);
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow_request());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.trips(), 2);
    }
}
