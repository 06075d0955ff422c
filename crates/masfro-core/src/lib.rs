//! `masfro-core` — foundational types for the MAS-FRO flood-aware routing
//! system.
//!
//! This crate is a dependency of every other `masfro-*` crate.  It
//! intentionally has no `masfro-*` dependencies and minimal external ones
//! (`thiserror`, `parking_lot`, `uuid`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`ids`]     | `NodeId`, `EdgeId`, `EdgeKey`, `AgentId`                  |
//! | [`geo`]     | `GeoPoint`, `BoundingBox`, `GridCell`, haversine distance |
//! | [`clock`]   | `SimClock` — offset/speedup simulated clock, `Timestamp`  |
//! | [`config`]  | `MasfroConfig` and its per-subsystem sections             |
//! | [`highway`] | `HighwayClass` with base speeds and vulnerability         |
//! | [`hazard`]  | `HazardObservation` sum type, `ScoutReport`, summaries    |
//! | [`route`]   | Route preferences, metrics, warnings, evacuation centers  |
//! | [`repo`]    | Repository and fetcher traits seen by the core            |
//! | [`error`]   | `CoreError`, `ValidationError`, `CoreResult`              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                      |
//! |---------|-------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.         |

pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod hazard;
pub mod highway;
pub mod ids;
pub mod repo;
pub mod route;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use clock::{ClockStatus, SimClock, Timestamp};
pub use config::{
    CacheConfig, GraphConfig, MasfroConfig, OrchestratorConfig, RiskConfig, RiskWeights,
    RoutingConfig, SchedulerConfig,
};
pub use error::{CoreError, CoreResult, FetchError, RepositoryError, ValidationError};
pub use geo::{BoundingBox, GeoPoint, GridCell};
pub use hazard::{
    DamReading, FusionSummary, HazardObservation, HazardSource, RasterSample, ReportType,
    ReturnPeriod, ScoutClassification, ScoutReport, ScrapeSnippet, StationReading,
    DEFAULT_TTL_SECONDS, MAX_REPORT_TEXT,
};
pub use highway::HighwayClass;
pub use ids::{AgentId, EdgeId, EdgeKey, NodeId};
pub use repo::{
    EvacuationRepository, FloodCollection, FloodDataRepository, OccupancyStatistics, RawReport,
    RiverLevelRow, SocialFetcher, StationFetcher, WeatherFetcher, WeatherRow, WeatherSnapshot,
};
pub use route::{
    ComputedRoute, EvacuationCenter, EvacuationChoice, PathMetrics, RankedCenter, RouteMode,
    RouteWarning, RoutePreferences, VehicleType, WarningSeverity,
};
