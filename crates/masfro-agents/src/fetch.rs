//! Resilience plumbing for external fetchers: bounded retries with backoff
//! and a per-source circuit breaker.

use std::time::Duration;

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use masfro_core::{FetchError, SimClock, Timestamp};

// ── RetryPolicy ───────────────────────────────────────────────────────────────

/// Backoff schedule for transient fetch failures.
///
/// The operation runs once, then once more after each delay.  The default
/// schedule (200 ms → 1 s → 5 s) suits scrapers that rate-limit briefly.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_millis(200),
                Duration::from_secs(1),
                Duration::from_secs(5),
            ],
        }
    }
}

impl RetryPolicy {
    /// No retries at all — for tests and interactive paths.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    /// Run `op`, retrying per the schedule.  Returns the last error when
    /// every attempt fails.
    pub fn run<T, F>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Result<T, FetchError>,
    {
        let mut last = match op() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        for (attempt, delay) in self.delays.iter().enumerate() {
            std::thread::sleep(*delay);
            match op() {
                Ok(value) => {
                    debug!(attempt = attempt + 1, "fetch recovered after retry");
                    return Ok(value);
                }
                Err(e) => last = e,
            }
        }
        Err(last)
    }
}

// ── CircuitBreaker ────────────────────────────────────────────────────────────

/// Breaker state, for status endpoints.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Timestamp,
}

/// Trips open after N consecutive failures; after the cooldown one probe
/// call is let through and its outcome decides between closing again and
/// re-opening.
pub struct CircuitBreaker {
    threshold: u32,
    cooldown_s: f64,
    clock: Arc<SimClock>,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown_s: f64, clock: Arc<SimClock>) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown_s,
            clock,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: Timestamp(0.0),
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Run `op` under the breaker.
    pub fn call<T, F>(&self, op: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Result<T, FetchError>,
    {
        let now = self.clock.now();
        {
            let mut inner = self.inner.lock();
            match inner.state {
                CircuitState::Closed | CircuitState::HalfOpen => {}
                CircuitState::Open => {
                    if now.seconds_since(inner.opened_at) < self.cooldown_s {
                        return Err(FetchError::CircuitOpen);
                    }
                    // Cooldown elapsed: admit one probe.
                    inner.state = CircuitState::HalfOpen;
                    debug!("circuit breaker probing after cooldown");
                }
            }
        }

        match op() {
            Ok(value) => {
                let mut inner = self.inner.lock();
                if inner.state != CircuitState::Closed {
                    debug!("circuit breaker closed after successful probe");
                }
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                Ok(value)
            }
            Err(e) => {
                let mut inner = self.inner.lock();
                inner.consecutive_failures += 1;
                if inner.state == CircuitState::HalfOpen
                    || inner.consecutive_failures >= self.threshold
                {
                    inner.state = CircuitState::Open;
                    inner.opened_at = now;
                    warn!(
                        failures = inner.consecutive_failures,
                        "circuit breaker opened"
                    );
                }
                Err(e)
            }
        }
    }
}
