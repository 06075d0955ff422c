//! Interfaces to external collaborators: persistent repositories and data
//! fetchers.
//!
//! The core holds no persisted state of its own.  Evacuation-center occupancy
//! and collection history live behind the repository traits here; gauge
//! levels, weather, and social reports arrive through the fetcher traits.
//! Implementations (SQLite, HTTP scrapers) live outside the core; tests use
//! in-memory stand-ins.

use uuid::Uuid;

use crate::clock::Timestamp;
use crate::error::{FetchError, RepositoryError};
use crate::geo::GeoPoint;
use crate::hazard::StationReading;
use crate::route::EvacuationCenter;

// ── EvacuationRepository ──────────────────────────────────────────────────────

/// Aggregate occupancy numbers across all active centers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OccupancyStatistics {
    pub active_centers: usize,
    pub full_centers: usize,
    pub total_capacity: u64,
    pub total_occupancy: u64,
}

/// Store of evacuation centers and their occupancy.
///
/// The core only ever reads snapshots; occupancy mutation is the
/// repository's responsibility (it owns clamping to `[0, capacity]` and the
/// audit trail behind `reason`).
pub trait EvacuationRepository: Send + Sync {
    fn get_all(&self) -> Result<Vec<EvacuationCenter>, RepositoryError>;

    fn get_by_name(&self, name: &str) -> Result<Option<EvacuationCenter>, RepositoryError>;

    /// Set the occupancy of `name` to `occupancy`, recording `reason`.
    fn update_occupancy(
        &self,
        name: &str,
        occupancy: u32,
        reason: &str,
    ) -> Result<(), RepositoryError>;

    /// Add `count` evacuees to `name`; returns the new occupancy.
    fn add_evacuees(&self, name: &str, count: u32) -> Result<u32, RepositoryError>;

    /// Zero the occupancy of every center.
    fn reset_all(&self) -> Result<(), RepositoryError>;

    fn statistics(&self) -> Result<OccupancyStatistics, RepositoryError>;
}

// ── FloodDataRepository ───────────────────────────────────────────────────────

/// One river-gauge row inside a collection.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiverLevelRow {
    pub station: String,
    pub level_m: f32,
    pub alert_level: Option<String>,
}

/// One weather row inside a collection.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeatherRow {
    pub location: GeoPoint,
    pub rainfall_mm_1h: f32,
    pub temperature_c: Option<f32>,
}

/// Header plus child rows for one collection run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FloodCollection {
    pub id: Uuid,
    pub collected_at: Timestamp,
    pub source: String,
    pub river_levels: Vec<RiverLevelRow>,
    pub weather: Vec<WeatherRow>,
}

impl FloodCollection {
    pub fn new(collected_at: Timestamp, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            collected_at,
            source: source.into(),
            river_levels: Vec::new(),
            weather: Vec::new(),
        }
    }
}

/// Historical record of collection runs.
pub trait FloodDataRepository: Send + Sync {
    /// Persist a collection header and its child rows atomically.
    fn record_collection(&self, collection: &FloodCollection) -> Result<(), RepositoryError>;

    /// Most recent collections, newest first.
    fn recent_collections(&self, limit: usize) -> Result<Vec<FloodCollection>, RepositoryError>;
}

// ── Fetchers ──────────────────────────────────────────────────────────────────

/// A weather snapshot for one location.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeatherSnapshot {
    pub location: GeoPoint,
    pub rainfall_mm_1h: f32,
    pub rainfall_mm_24h: Option<f32>,
    pub temperature_c: Option<f32>,
    pub observed_at: Timestamp,
}

/// An unclassified crowdsourced report as fetched from a feed.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawReport {
    pub text: String,
    pub location: Option<GeoPoint>,
    pub image_ref: Option<String>,
    pub posted_at: Timestamp,
}

/// Fetches the latest gauge-station levels.
pub trait StationFetcher: Send + Sync {
    fn fetch_station_levels(&self) -> Result<Vec<StationReading>, FetchError>;
}

/// Fetches current weather for a point.
pub trait WeatherFetcher: Send + Sync {
    fn fetch_weather(&self, at: GeoPoint) -> Result<WeatherSnapshot, FetchError>;
}

/// Fetches recent crowdsourced reports.
pub trait SocialFetcher: Send + Sync {
    fn fetch_social_reports(
        &self,
        limit: usize,
        since: Timestamp,
    ) -> Result<Vec<RawReport>, FetchError>;
}
