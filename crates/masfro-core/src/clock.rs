//! Simulated clock — the single time source for the whole core.
//!
//! # Design
//!
//! All temporal decay, cache expiry, and mission timeouts consume
//! [`SimClock::now`]; no component reads system time directly.  The clock
//! normally tracks wall time, but supports two test/simulation controls:
//!
//! - `advance_minutes(n)`: jump forward instantly (triggers decay on the
//!   next fusion pass without waiting).
//! - `set_speedup_factor(f)`: run simulated time at `f`× real speed
//!   (`f = 0` pauses simulated time).
//!
//! A speedup change first folds the elapsed speedup surplus into the base
//! offset so the reference point for future speedup stays correct.
//!
//! The clock is shared as `Arc<SimClock>`; interior state sits behind a
//! `parking_lot::Mutex` so handles are `Send + Sync`.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::error::{CoreError, CoreResult};

// ── Timestamp ─────────────────────────────────────────────────────────────────

/// A point in simulated time: seconds since the Unix epoch.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(pub f64);

impl Timestamp {
    /// Seconds elapsed from `earlier` to `self`.  Negative if `earlier` is
    /// in the future (callers clamp where that matters).
    #[inline]
    pub fn seconds_since(self, earlier: Timestamp) -> f64 {
        self.0 - earlier.0
    }

    /// The timestamp `secs` seconds after `self`.
    #[inline]
    pub fn plus_secs(self, secs: f64) -> Timestamp {
        Timestamp(self.0 + secs)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={:.3}s", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Snapshot of the clock's control state, for diagnostics endpoints.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockStatus {
    pub wall_secs: f64,
    pub sim_secs: f64,
    pub offset_minutes: f64,
    pub speedup_factor: f64,
    pub is_real_time: bool,
}

#[derive(Debug)]
struct ClockState {
    /// Offset accumulated by `advance_minutes`, in seconds.
    offset_secs: f64,
    /// Speedup surplus folded in by previous `set_speedup_factor` calls.
    speedup_base_secs: f64,
    /// Current speedup multiplier (1.0 = real time).
    speedup_factor: f64,
    /// Wall time at which the current speedup period began.
    speedup_started_at: Option<f64>,
}

/// Offset/speedup simulated UTC clock.
#[derive(Debug)]
pub struct SimClock {
    state: Mutex<ClockState>,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClockState {
                offset_secs: 0.0,
                speedup_base_secs: 0.0,
                speedup_factor: 1.0,
                speedup_started_at: None,
            }),
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> Timestamp {
        let wall = wall_secs();
        let state = self.state.lock();
        let speedup_extra = match state.speedup_started_at {
            Some(started) if state.speedup_factor != 1.0 => {
                (wall - started) * (state.speedup_factor - 1.0)
            }
            _ => 0.0,
        };
        Timestamp(wall + state.offset_secs + state.speedup_base_secs + speedup_extra)
    }

    /// Jump forward `minutes` simulated minutes instantly.
    pub fn advance_minutes(&self, minutes: f64) {
        let mut state = self.state.lock();
        flush_speedup(&mut state);
        state.offset_secs += minutes * 60.0;
    }

    /// Set the time speedup multiplier.
    ///
    /// `1.0` → real time, `60.0` → one real second is one simulated minute,
    /// `0.0` → simulated time pauses.  Negative factors are rejected.
    pub fn set_speedup_factor(&self, factor: f64) -> CoreResult<()> {
        if factor < 0.0 || !factor.is_finite() {
            return Err(CoreError::Config(format!(
                "speedup factor must be finite and >= 0, got {factor}"
            )));
        }
        let mut state = self.state.lock();
        flush_speedup(&mut state);
        state.speedup_factor = factor;
        state.speedup_started_at = (factor != 1.0).then(wall_secs);
        Ok(())
    }

    /// Return to real wall-clock time, dropping all offsets.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.offset_secs = 0.0;
        state.speedup_base_secs = 0.0;
        state.speedup_factor = 1.0;
        state.speedup_started_at = None;
    }

    pub fn status(&self) -> ClockStatus {
        let wall = wall_secs();
        let sim = self.now().0;
        let state = self.state.lock();
        ClockStatus {
            wall_secs: wall,
            sim_secs: sim,
            offset_minutes: (sim - wall) / 60.0,
            speedup_factor: state.speedup_factor,
            is_real_time: state.offset_secs == 0.0
                && state.speedup_base_secs == 0.0
                && state.speedup_factor == 1.0,
        }
    }
}

/// Fold the surplus of an active speedup period into the base offset.
fn flush_speedup(state: &mut ClockState) {
    if let Some(started) = state.speedup_started_at
        && state.speedup_factor != 1.0
    {
        let elapsed = wall_secs() - started;
        state.speedup_base_secs += elapsed * (state.speedup_factor - 1.0);
    }
    state.speedup_started_at = None;
}

fn wall_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
