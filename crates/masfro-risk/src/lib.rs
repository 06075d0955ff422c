//! `masfro-risk` — deterministic hazard-to-risk scoring.
//!
//! Every function here is pure: identical inputs yield identical outputs
//! regardless of call order or thread, which is what lets the fusion engine
//! recompute thousands of edges in any order and still commit a coherent
//! batch.
//!
//! All scores are normalized to `[0, 1]`:
//!
//! - `0.0` — completely safe
//! - `0.3` — minor flooding
//! - `0.6` — significant flooding
//! - `0.9+` — dangerous / impassable
//!
//! The hydrological mapping follows the energy-head formulation
//! `E = h + v²/(2g)` (depth plus velocity head), which is a strong predictor
//! of infrastructure damage during floods.

use masfro_core::{HighwayClass, VehicleType};

#[cfg(test)]
mod tests;

/// Gravitational acceleration, m/s².
const GRAVITY: f32 = 9.81;

// ── Hydrological risk ─────────────────────────────────────────────────────────

/// Risk from water depth and flow velocity via the energy head
/// `E = depth + v²/(2g)`.
///
/// Piecewise-linear normalization:
///
/// | Energy head   | Risk band   |
/// |---------------|-------------|
/// | `[0.0, 0.3)`  | `[0.0, 0.4)`|
/// | `[0.3, 0.6)`  | `[0.4, 0.7)`|
/// | `[0.6, 1.0)`  | `[0.7, 1.0)`|
/// | `≥ 1.0`       | `1.0`       |
pub fn hydrological_risk(depth_m: f32, velocity_m_s: f32) -> f32 {
    if depth_m <= 0.0 {
        return 0.0;
    }
    let energy = depth_m + velocity_m_s * velocity_m_s / (2.0 * GRAVITY);

    let risk = if energy < 0.3 {
        energy / 0.3 * 0.4
    } else if energy < 0.6 {
        0.4 + (energy - 0.3) / 0.3 * 0.3
    } else {
        0.7 + ((energy - 0.6) / 0.4 * 0.3).min(0.3)
    };
    risk.min(1.0)
}

// ── Infrastructure risk ───────────────────────────────────────────────────────

/// Vulnerability of the roadway itself, scaled up with inundation depth.
///
/// `base_vulnerability(class) × (1 + min(depth × 0.5, 1.0))`, clamped to 1.
pub fn infrastructure_risk(class: HighwayClass, depth_m: f32) -> f32 {
    let depth_multiplier = 1.0 + (depth_m.max(0.0) * 0.5).min(1.0);
    (class.vulnerability() * depth_multiplier).min(1.0)
}

// ── Composite risk ────────────────────────────────────────────────────────────

/// Weighted combination of the four risk components.
///
/// Weights: hydrological 0.50, infrastructure 0.25, congestion 0.15,
/// historical 0.10.  `congestion` and `historical` are already normalized.
pub fn composite_risk(hydrological: f32, infrastructure: f32, congestion: f32, historical: f32) -> f32 {
    let composite = hydrological * 0.50
        + infrastructure * 0.25
        + congestion * 0.15
        + historical * 0.10;
    composite.clamp(0.0, 1.0)
}

// ── Depth-to-risk ─────────────────────────────────────────────────────────────

/// Direct depth → risk mapping used for raster and interpolated gauge depth.
///
/// Monotonically non-decreasing in `depth_m`; linear up to 0.6 m, then
/// progressively compressed so extreme depths saturate at 1.0.
pub fn depth_to_risk(depth_m: f32) -> f32 {
    let d = depth_m.max(0.0);
    if d <= 0.6 {
        d
    } else if d <= 1.0 {
        0.6 + (d - 0.6) * 0.5
    } else {
        (0.8 + (d - 1.0) * 0.2).min(1.0)
    }
}

// ── Temporal decay ────────────────────────────────────────────────────────────

/// Exponential half-life decay: `risk · 2^(−age / half_life)`.
///
/// Defaults elsewhere: 1 800 s for scout reports, 3 600 s for station data.
/// Non-positive half-lives kill the signal outright rather than divide by
/// zero.
pub fn temporal_decay(risk: f32, age_seconds: f64, half_life_seconds: f64) -> f32 {
    if half_life_seconds <= 0.0 {
        return 0.0;
    }
    let age = age_seconds.max(0.0);
    risk * (2.0_f64.powf(-age / half_life_seconds)) as f32
}

// ── Passability ───────────────────────────────────────────────────────────────

/// Judgment of whether a vehicle can traverse water of the given depth and
/// velocity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Passability {
    pub passable: bool,
    pub confidence: f32,
    pub reason: String,
}

/// Depth thresholds per vehicle, metres: (static water, flowing water,
/// maximum safe velocity).
fn vehicle_thresholds(vehicle: VehicleType) -> (f32, f32, f32) {
    match vehicle {
        VehicleType::Car   => (0.3, 0.4, 0.5),
        VehicleType::Suv   => (0.5, 0.6, 0.5),
        VehicleType::Truck => (0.6, 0.7, 0.6),
    }
}

/// Can `vehicle` cross water `depth_m` deep flowing at `velocity_m_s`?
///
/// Water slower than 0.1 m/s is treated as static.
pub fn passability(depth_m: f32, velocity_m_s: f32, vehicle: VehicleType) -> Passability {
    let (static_depth, flowing_depth, max_velocity) = vehicle_thresholds(vehicle);

    if depth_m <= 0.0 {
        return Passability {
            passable: true,
            confidence: 1.0,
            reason: "no flooding detected".into(),
        };
    }

    if velocity_m_s < 0.1 {
        return if depth_m < static_depth {
            Passability {
                passable: true,
                confidence: 0.8,
                reason: format!("shallow static water ({depth_m:.2} m)"),
            }
        } else {
            Passability {
                passable: false,
                confidence: 0.9,
                reason: format!("water too deep ({depth_m:.2} m)"),
            }
        };
    }

    if depth_m < flowing_depth && velocity_m_s < max_velocity {
        Passability {
            passable: true,
            confidence: 0.6,
            reason: format!(
                "manageable flowing water ({depth_m:.2} m at {velocity_m_s:.2} m/s)"
            ),
        }
    } else {
        Passability {
            passable: false,
            confidence: 0.95,
            reason: format!(
                "dangerous flowing water ({depth_m:.2} m at {velocity_m_s:.2} m/s)"
            ),
        }
    }
}

// ── Travel-time adjustment ────────────────────────────────────────────────────

/// Slow down a base travel time according to segment risk.
///
/// Low risk costs 0–9 %, moderate 10–28 %, high 30–50 %.
pub fn travel_time_adjustment(base_minutes: f32, risk: f32) -> f32 {
    let r = risk.clamp(0.0, 1.0);
    let factor = if r < 0.3 {
        1.0 + r * 0.3
    } else if r < 0.6 {
        1.1 + (r - 0.3) * 0.6
    } else {
        1.3 + (r - 0.6) * 0.5
    };
    base_minutes * factor
}

// ── Risk category ─────────────────────────────────────────────────────────────

/// Descriptive band for a risk score.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RiskCategory {
    Safe,
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskCategory {
    pub fn of(risk: f32) -> RiskCategory {
        if risk < 0.2 {
            RiskCategory::Safe
        } else if risk < 0.4 {
            RiskCategory::Low
        } else if risk < 0.6 {
            RiskCategory::Moderate
        } else if risk < 0.8 {
            RiskCategory::High
        } else {
            RiskCategory::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskCategory::Safe     => "safe",
            RiskCategory::Low      => "low",
            RiskCategory::Moderate => "moderate",
            RiskCategory::High     => "high",
            RiskCategory::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
