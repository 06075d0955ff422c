//! Routing request/response data model.
//!
//! These DTOs cross crate boundaries (bus payloads, mission results, the
//! HTTP layer's contracts), so they live in core rather than in the routing
//! engine.

use crate::clock::Timestamp;
use crate::geo::GeoPoint;
use crate::ids::NodeId;

// ── Preferences ───────────────────────────────────────────────────────────────

/// How strongly the route should trade distance for safety.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RouteMode {
    Safest,
    #[default]
    Balanced,
    Fastest,
}

/// Vehicle class, for passability thresholds.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleType {
    #[default]
    Car,
    Suv,
    Truck,
}

/// Per-request routing preferences.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutePreferences {
    pub mode: RouteMode,
    /// `false` degrades the weight function to pure distance; the max-risk
    /// threshold and warnings stay active.
    pub avoid_floods: bool,
    pub vehicle: VehicleType,
    /// Edges at or above this risk are treated as impassable.
    pub max_risk_threshold: f32,
}

impl Default for RoutePreferences {
    fn default() -> Self {
        Self {
            mode: RouteMode::Balanced,
            avoid_floods: true,
            vehicle: VehicleType::Car,
            max_risk_threshold: 0.95,
        }
    }
}

// ── Warnings ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WarningSeverity {
    Info,
    Caution,
    Danger,
}

/// Structured route warning.  The HTTP layer stringifies these for clients.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteWarning {
    pub severity: WarningSeverity,
    pub message: String,
    pub location: Option<GeoPoint>,
}

impl RouteWarning {
    pub fn new(severity: WarningSeverity, message: impl Into<String>) -> Self {
        Self { severity, message: message.into(), location: None }
    }

    pub fn at(severity: WarningSeverity, message: impl Into<String>, location: GeoPoint) -> Self {
        Self { severity, message: message.into(), location: Some(location) }
    }
}

// ── Path metrics ──────────────────────────────────────────────────────────────

/// Aggregate statistics for a computed path, produced in one sweep.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathMetrics {
    pub total_distance_m: f32,
    pub num_segments: usize,
    /// Distance-weighted average of segment risk.
    pub average_risk: f32,
    pub max_risk: f32,
    /// Base travel time adjusted for risk slowdown.
    pub estimated_time_minutes: f32,
    /// Segments with risk ≥ 0.6.
    pub high_risk_segments: usize,
    /// Segments with risk ≥ 0.9.
    pub critical_risk_segments: usize,
}

// ── ComputedRoute ─────────────────────────────────────────────────────────────

/// A complete answer to a routing query.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComputedRoute {
    /// Node sequence from start to end (length 1 when start == end).
    pub nodes: Vec<NodeId>,
    /// Coordinates of `nodes`, same order and length.
    pub coordinates: Vec<GeoPoint>,
    pub metrics: PathMetrics,
    pub warnings: Vec<RouteWarning>,
    /// Set when the max-risk threshold had to be relaxed to find a path;
    /// `f32::INFINITY` means the threshold was ignored entirely.
    pub relaxed_threshold: Option<f32>,
}

// ── Evacuation centers ────────────────────────────────────────────────────────

/// Snapshot of an evacuation center, read through the repository interface.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvacuationCenter {
    pub id: i64,
    pub name: String,
    pub location: GeoPoint,
    pub capacity: u32,
    pub current_occupancy: u32,
    pub center_type: String,
    pub barangay: String,
    pub contact: Option<String>,
    pub facilities: Vec<String>,
    pub is_active: bool,
    pub updated_at: Timestamp,
}

impl EvacuationCenter {
    /// `true` if the center can take at least one more evacuee.
    #[inline]
    pub fn has_space(&self) -> bool {
        self.current_occupancy < self.capacity
    }
}

/// One candidate center with its route and selection score (lower is better).
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedCenter {
    pub center: EvacuationCenter,
    pub route: ComputedRoute,
    pub score: f32,
}

/// Result of a nearest-evacuation-center query: the selected center plus the
/// remaining candidates ordered by the same metric.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvacuationChoice {
    pub best: RankedCenter,
    pub alternatives: Vec<RankedCenter>,
}
