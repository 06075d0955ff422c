//! Flood-depth raster access.
//!
//! The engine consumes already-georeferenced rasters through this trait;
//! raster authoring and file formats live outside the core.  The simulation
//! crate supplies a deterministic synthetic provider.

use thiserror::Error;

use masfro_core::{BoundingBox, GeoPoint, ReturnPeriod};

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("raster unavailable: {0}")]
    Unavailable(String),

    #[error("raster read failed: {0}")]
    Read(String),
}

/// Samples flood depth for a scenario snapshot at arbitrary coordinates.
pub trait RasterProvider: Send + Sync {
    /// Depth in metres at `point` for `(period, time_step)`, or `None` when
    /// the point lies outside the raster's coverage.
    fn depth_at(
        &self,
        period: ReturnPeriod,
        time_step: u8,
        point: GeoPoint,
    ) -> Result<Option<f32>, RasterError>;

    /// Geographic extent of the raster, if bounded.  Edges inside the
    /// footprint become fusion candidates while a scenario is active.
    fn footprint(&self) -> Option<BoundingBox> {
        None
    }
}
