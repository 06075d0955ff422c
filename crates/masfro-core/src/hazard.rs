//! Inbound hazard observations.
//!
//! The original system modelled observations as dictionaries keyed by
//! convention; here they are a tagged sum so every consumer matches
//! exhaustively.  Observations are short-lived: validated on ingest, cached
//! by the fusion engine until their TTL elapses or LRU evicts them.

use crate::clock::Timestamp;
use crate::error::ValidationError;
use crate::geo::GeoPoint;

/// Default observation lifetime, seconds.
pub const DEFAULT_TTL_SECONDS: u32 = 3_600;

/// Maximum free-text length on a scout report.
pub const MAX_REPORT_TEXT: usize = 500;

// ── Observation variants ──────────────────────────────────────────────────────

/// A river gauge station reading.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StationReading {
    pub station: String,
    pub location: GeoPoint,
    /// Estimated roadway inundation depth near the station, metres.
    pub depth_m: Option<f32>,
    pub rainfall_mm_1h: Option<f32>,
    pub confidence: f32,
    pub observed_at: Timestamp,
    pub ttl_seconds: u32,
}

/// A point sample from a georeferenced flood-depth raster.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RasterSample {
    pub location: GeoPoint,
    pub depth_m: f32,
    pub return_period: ReturnPeriod,
    pub time_step: u8,
    pub observed_at: Timestamp,
    pub ttl_seconds: u32,
}

/// Classifier verdict attached to a crowdsourced report.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoutClassification {
    pub is_flood_related: bool,
    pub report_type: ReportType,
    pub severity: f32,
    pub confidence: f32,
}

/// A crowdsourced field report (user feedback or social media).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoutReport {
    pub location: GeoPoint,
    /// Free text, at most [`MAX_REPORT_TEXT`] chars.
    pub text: Option<String>,
    pub image_ref: Option<String>,
    pub classification: ScoutClassification,
    pub observed_at: Timestamp,
    pub ttl_seconds: u32,
}

/// A dam water-level reading upstream of the service area.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamReading {
    pub dam: String,
    pub location: GeoPoint,
    /// Normalized spill severity derived from the level vs. spilling level.
    pub severity: f32,
    pub confidence: f32,
    pub observed_at: Timestamp,
    pub ttl_seconds: u32,
}

/// A scraped advisory snippet that was geolocated to a point.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrapeSnippet {
    pub source: String,
    pub location: GeoPoint,
    pub severity: f32,
    pub confidence: f32,
    pub observed_at: Timestamp,
    pub ttl_seconds: u32,
}

// ── HazardObservation ─────────────────────────────────────────────────────────

/// Where an observation came from.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HazardSource {
    Station,
    Raster,
    Report,
    Dam,
    Scrape,
}

/// Any inbound hazard signal.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HazardObservation {
    Station(StationReading),
    Raster(RasterSample),
    Scout(ScoutReport),
    Dam(DamReading),
    Scrape(ScrapeSnippet),
}

impl HazardObservation {
    pub fn source(&self) -> HazardSource {
        match self {
            HazardObservation::Station(_) => HazardSource::Station,
            HazardObservation::Raster(_)  => HazardSource::Raster,
            HazardObservation::Scout(_)   => HazardSource::Report,
            HazardObservation::Dam(_)     => HazardSource::Dam,
            HazardObservation::Scrape(_)  => HazardSource::Scrape,
        }
    }

    pub fn location(&self) -> GeoPoint {
        match self {
            HazardObservation::Station(o) => o.location,
            HazardObservation::Raster(o)  => o.location,
            HazardObservation::Scout(o)   => o.location,
            HazardObservation::Dam(o)     => o.location,
            HazardObservation::Scrape(o)  => o.location,
        }
    }

    pub fn observed_at(&self) -> Timestamp {
        match self {
            HazardObservation::Station(o) => o.observed_at,
            HazardObservation::Raster(o)  => o.observed_at,
            HazardObservation::Scout(o)   => o.observed_at,
            HazardObservation::Dam(o)     => o.observed_at,
            HazardObservation::Scrape(o)  => o.observed_at,
        }
    }

    pub fn ttl_seconds(&self) -> u32 {
        match self {
            HazardObservation::Station(o) => o.ttl_seconds,
            HazardObservation::Raster(o)  => o.ttl_seconds,
            HazardObservation::Scout(o)   => o.ttl_seconds,
            HazardObservation::Dam(o)     => o.ttl_seconds,
            HazardObservation::Scrape(o)  => o.ttl_seconds,
        }
    }

    /// `true` once the observation's TTL has elapsed at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.seconds_since(self.observed_at()) >= self.ttl_seconds() as f64
    }

    /// Boundary validation.  Invalid observations are dropped with a warning
    /// counter by the ingesting component; they never corrupt caches.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let loc = self.location();
        if !loc.is_finite() || loc.lat.abs() > 90.0 || loc.lon.abs() > 180.0 {
            return Err(ValidationError::Coordinate { lat: loc.lat, lon: loc.lon });
        }

        match self {
            HazardObservation::Station(o) => {
                if let Some(d) = o.depth_m {
                    check_non_negative("depth_m", d)?;
                }
                if let Some(r) = o.rainfall_mm_1h {
                    check_non_negative("rainfall_mm_1h", r)?;
                }
                check_unit("confidence", o.confidence)?;
            }
            HazardObservation::Raster(o) => {
                check_non_negative("depth_m", o.depth_m)?;
            }
            HazardObservation::Scout(o) => {
                check_unit("severity", o.classification.severity)?;
                check_unit("confidence", o.classification.confidence)?;
                if let Some(text) = &o.text
                    && text.chars().count() > MAX_REPORT_TEXT
                {
                    return Err(ValidationError::TextTooLong {
                        len: text.chars().count(),
                        max: MAX_REPORT_TEXT,
                    });
                }
            }
            HazardObservation::Dam(o) => {
                check_unit("severity", o.severity)?;
                check_unit("confidence", o.confidence)?;
            }
            HazardObservation::Scrape(o) => {
                check_unit("severity", o.severity)?;
                check_unit("confidence", o.confidence)?;
            }
        }
        Ok(())
    }
}

fn check_unit(field: &'static str, value: f32) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(ValidationError::UnitRange { field, value });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f32) -> Result<(), ValidationError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

// ── ReportType ────────────────────────────────────────────────────────────────

/// What a crowdsourced report describes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReportType {
    Flooding,
    Clear,
    Blocked,
    Traffic,
    Hazard,
    Evacuation,
}

// ── ReturnPeriod ──────────────────────────────────────────────────────────────

/// Scenario tag selecting a pre-generated flood-depth raster family.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReturnPeriod {
    Rr01,
    Rr02,
    Rr03,
    Rr04,
}

impl ReturnPeriod {
    pub fn tag(self) -> &'static str {
        match self {
            ReturnPeriod::Rr01 => "rr01",
            ReturnPeriod::Rr02 => "rr02",
            ReturnPeriod::Rr03 => "rr03",
            ReturnPeriod::Rr04 => "rr04",
        }
    }
}

impl std::fmt::Display for ReturnPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

// ── FusionSummary ─────────────────────────────────────────────────────────────

/// Outcome of one hazard-fusion recalculation pass.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FusionSummary {
    pub edges_updated: usize,
    pub stations_used: usize,
    pub reports_used: usize,
    pub duration_ms: f64,
    pub average_risk: f32,
}
