//! Process-wide configuration.
//!
//! `MasfroConfig` is built once at process init (defaults → env overrides)
//! and passed by reference or `Arc` into every component.  It is immutable
//! afterwards; nothing in the core mutates configuration at runtime.

use crate::error::{CoreError, CoreResult};
use crate::geo::BoundingBox;

// ── Sections ──────────────────────────────────────────────────────────────────

/// Fusion weights for the three risk contributions.  Must sum to 1.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiskWeights {
    pub depth: f32,
    pub crowd: f32,
    pub historical: f32,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiskConfig {
    pub weights: RiskWeights,
    /// Radius around a gauge station within which edges are recomputed.
    pub radius_m: f32,
    /// Half-life of scout-report influence, seconds.
    pub decay_half_life_scout_s: f64,
    /// Half-life of station-reading influence, seconds.
    pub decay_half_life_station_s: f64,
    /// Sigmoid steepness for crowd-report aggregation.
    pub crowd_steepness: f32,
    /// Sigmoid inflection point for crowd-report aggregation.
    pub crowd_inflection: f32,
    /// Radius around a scout report within which edges are affected.
    pub report_radius_m: f32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights { depth: 0.5, crowd: 0.3, historical: 0.2 },
            radius_m: 800.0,
            decay_half_life_scout_s: 1_800.0,
            decay_half_life_station_s: 3_600.0,
            crowd_steepness: 8.0,
            crowd_inflection: 0.3,
            report_radius_m: 200.0,
        }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutingConfig {
    /// Maximum snap distance from a query point to the nearest node, metres.
    pub max_snap_m: f32,
    /// Risk penalty per mode: safest / balanced / fastest.
    pub penalty_safest: f64,
    pub penalty_balanced: f64,
    pub penalty_fastest: f64,
    /// Edges at or above this risk are impassable.
    pub max_risk_threshold: f32,
    /// Retry a failed search with a stepwise-relaxed threshold
    /// (0.95 → 0.99 → unlimited), marking the route with warnings.
    pub relax_on_failure: bool,
    /// Per-request search deadline, milliseconds of simulated time.
    pub deadline_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_snap_m: 500.0,
            penalty_safest: 100_000.0,
            penalty_balanced: 2_000.0,
            penalty_fastest: 0.0,
            max_risk_threshold: 0.95,
            relax_on_failure: true,
            deadline_ms: 2_000,
        }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    pub tick_interval_ms: u64,
    /// Consecutive failed ticks after which an agent is isolated.
    pub isolation_threshold: u32,
    /// `true` disables the background cadence thread entirely.
    pub disabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 1_000, isolation_threshold: 3, disabled: false }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrchestratorConfig {
    pub max_concurrent_missions: usize,
    pub step_timeout_s: f64,
    /// How long terminal missions remain queryable.
    pub mission_retention_s: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_missions: 10,
            step_timeout_s: 30.0,
            mission_retention_s: 300.0,
        }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheConfig {
    pub station_max: usize,
    pub scout_max: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { station_max: 100, scout_max: 1_000 }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphConfig {
    /// Declared service area.  Out-of-box nodes load with a warning.
    pub bbox: BoundingBox,
    /// Penalty factor baked into the stored per-edge `weight` column.
    pub weight_penalty: f32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            // Marikina valley service area.
            bbox: BoundingBox::new(14.58, 14.78, 121.05, 121.18),
            weight_penalty: 2_000.0,
        }
    }
}

// ── MasfroConfig ──────────────────────────────────────────────────────────────

/// Top-level immutable configuration.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MasfroConfig {
    pub risk: RiskConfig,
    pub routing: RoutingConfig,
    pub scheduler: SchedulerConfig,
    pub orchestrator: OrchestratorConfig,
    pub caches: CacheConfig,
    pub graph: GraphConfig,
    /// Disables optional heavy subsystems (raster preloading, large caches).
    pub low_ram: bool,
}

impl MasfroConfig {
    /// Defaults with `MASFRO_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if env_flag("MASFRO_LOW_RAM") {
            config.low_ram = true;
        }
        if env_flag("MASFRO_DISABLE_SCHEDULER") {
            config.scheduler.disabled = true;
        }
        if let Ok(raw) = std::env::var("MASFRO_SCHEDULER_INTERVAL")
            && let Ok(ms) = raw.trim().parse::<u64>()
        {
            config.scheduler.tick_interval_ms = ms;
        }

        config
    }

    /// Reject configurations the core cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        let w = self.risk.weights;
        let sum = w.depth + w.crowd + w.historical;
        if (sum - 1.0).abs() > 1e-3 {
            return Err(CoreError::Config(format!(
                "risk weights must sum to 1.0, got {sum:.4}"
            )));
        }
        if self.risk.radius_m <= 0.0 {
            return Err(CoreError::Config("risk.radius_m must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.routing.max_risk_threshold)
            || self.routing.max_risk_threshold == 0.0
        {
            return Err(CoreError::Config(
                "routing.max_risk_threshold must be in (0, 1]".into(),
            ));
        }
        if self.orchestrator.max_concurrent_missions == 0 {
            return Err(CoreError::Config(
                "orchestrator.max_concurrent_missions must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// `true` if the variable is set to a truthy value (`1`, `true`, `yes`).
fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
