//! Core error types.
//!
//! Sub-crates define their own error enums and either convert into these or
//! wrap them as a variant.  Errors that cross the external-interface boundary
//! (`repo`, fetchers) live here so the traits can be defined without pulling
//! in any implementation crate.

use thiserror::Error;

/// The top-level error type for `masfro-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `masfro-core`.
pub type CoreResult<T> = Result<T, CoreError>;

// ── ValidationError ───────────────────────────────────────────────────────────

/// Why an inbound observation or request was rejected at the boundary.
///
/// Invalid observations are dropped with a warning counter, never crash a
/// component.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("non-finite coordinate ({lat}, {lon})")]
    Coordinate { lat: f32, lon: f32 },

    #[error("{field} = {value} outside [0, 1]")]
    UnitRange { field: &'static str, value: f32 },

    #[error("negative {field}: {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("report text is {len} chars (max {max})")]
    TextTooLong { len: usize, max: usize },
}

// ── RepositoryError ───────────────────────────────────────────────────────────

/// Errors surfaced by the evacuation / flood-data repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("no record named '{0}'")]
    NotFound(String),

    #[error("occupancy {requested} exceeds capacity {capacity} of '{name}'")]
    CapacityExceeded {
        name: String,
        requested: u32,
        capacity: u32,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

// ── FetchError ────────────────────────────────────────────────────────────────

/// Errors from external data fetchers (gauge scrapers, weather APIs, social
/// feeds).  The caller decides between retry, circuit-break, and degrade.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed payload: {0}")]
    Decode(String),

    #[error("request timed out")]
    Timeout,

    #[error("circuit breaker open")]
    CircuitOpen,
}
