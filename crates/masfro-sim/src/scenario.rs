//! Synthetic flood scenarios.
//!
//! Real deployments mount pre-generated flood-depth rasters per return
//! period; the simulation substitutes a deterministic synthetic field so
//! scenarios replay identically for a given seed.  Depth at a point is a
//! per-grid-cell base intensity (seeded noise) scaled by the return period's
//! severity and a ramp over the scenario's 18 time steps.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use masfro_core::{BoundingBox, GeoPoint, GridCell, ReturnPeriod};
use masfro_fusion::{RasterError, RasterProvider};

use crate::MAX_TIME_STEP;

/// Peak depth multiplier per return period, metres.
fn severity_m(period: ReturnPeriod) -> f32 {
    match period {
        ReturnPeriod::Rr01 => 0.5,
        ReturnPeriod::Rr02 => 1.0,
        ReturnPeriod::Rr03 => 1.6,
        ReturnPeriod::Rr04 => 2.2,
    }
}

/// Deterministic synthetic flood-depth raster covering one bounding box.
pub struct ScenarioRasterProvider {
    bbox: BoundingBox,
    /// Base inundation intensity per grid cell, in `[0.2, 1.0)` so every
    /// covered cell floods at least slightly once the ramp starts.
    base: FxHashMap<GridCell, f32>,
}

impl ScenarioRasterProvider {
    pub fn new(bbox: BoundingBox, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut base = FxHashMap::default();

        let min = GridCell::of(GeoPoint::new(bbox.min_lat, bbox.min_lon));
        let max = GridCell::of(GeoPoint::new(bbox.max_lat, bbox.max_lon));
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                base.insert(GridCell { x, y }, 0.2 + rng.gen_range(0.0..0.8));
            }
        }
        Self { bbox, base }
    }

    /// Depth for a cell intensity at `(period, time_step)`.
    fn scaled(&self, intensity: f32, period: ReturnPeriod, time_step: u8) -> f32 {
        let ramp = f32::from(time_step.min(MAX_TIME_STEP)) / f32::from(MAX_TIME_STEP);
        intensity * severity_m(period) * ramp
    }
}

impl RasterProvider for ScenarioRasterProvider {
    fn depth_at(
        &self,
        period: ReturnPeriod,
        time_step: u8,
        point: GeoPoint,
    ) -> Result<Option<f32>, RasterError> {
        if !self.bbox.contains(point) {
            return Ok(None);
        }
        let depth = self
            .base
            .get(&GridCell::of(point))
            .map(|&intensity| self.scaled(intensity, period, time_step));
        Ok(depth)
    }

    fn footprint(&self) -> Option<BoundingBox> {
        Some(self.bbox)
    }
}
