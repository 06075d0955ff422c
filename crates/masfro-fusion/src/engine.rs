//! The fusion engine and its recalculation pass.

use std::sync::Arc;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use masfro_core::{
    CacheConfig, EdgeId, EdgeKey, FusionSummary, GeoPoint, HazardObservation, ReturnPeriod,
    RiskConfig, Timestamp, ValidationError,
};
use masfro_graph::GraphStore;
use masfro_spatial::SpatialIndex;

use crate::cache::{ScoutCache, StationCache};
use crate::error::FusionResult;
use crate::raster::RasterProvider;

/// Stations contributing to one inverse-distance interpolation.
const IDW_STATIONS: usize = 3;

/// The hazard fusion engine.
///
/// Owns the observation caches exclusively.  `ingest` is cheap (cache
/// insert); all graph work happens in [`recalculate`], which commits exactly
/// one batch update per call.
pub struct HazardFusion {
    risk: RiskConfig,
    station_cache: StationCache,
    scout_cache: ScoutCache,
    raster: Option<Arc<dyn RasterProvider>>,
    /// Active raster scenario; set by the simulation manager.
    scenario: Option<(ReturnPeriod, u8)>,
    /// First pass recomputes every edge; later passes only candidates.
    first_pass_done: bool,
    dropped_observations: u64,
    raster_errors: u64,
}

impl HazardFusion {
    pub fn new(risk: RiskConfig, caches: &CacheConfig) -> Self {
        Self {
            risk,
            station_cache: StationCache::new(caches.station_max),
            scout_cache: ScoutCache::new(caches.scout_max),
            raster: None,
            scenario: None,
            first_pass_done: false,
            dropped_observations: 0,
            raster_errors: 0,
        }
    }

    /// Attach a flood-depth raster provider.
    pub fn with_raster(mut self, raster: Arc<dyn RasterProvider>) -> Self {
        self.raster = Some(raster);
        self
    }

    // ── Scenario control ──────────────────────────────────────────────────

    pub fn set_scenario(&mut self, period: ReturnPeriod, time_step: u8) {
        self.scenario = Some((period, time_step));
    }

    pub fn clear_scenario(&mut self) {
        self.scenario = None;
    }

    pub fn scenario(&self) -> Option<(ReturnPeriod, u8)> {
        self.scenario
    }

    // ── Ingest ────────────────────────────────────────────────────────────

    /// Validate and cache one observation.
    ///
    /// Invalid or already-expired observations are dropped (counted) and the
    /// validation error is returned for the caller's warning log.
    pub fn ingest(
        &mut self,
        observation: HazardObservation,
        now: Timestamp,
    ) -> Result<(), ValidationError> {
        if let Err(e) = observation.validate() {
            self.dropped_observations += 1;
            return Err(e);
        }
        if observation.is_expired(now) {
            self.dropped_observations += 1;
            return Ok(());
        }

        match observation {
            HazardObservation::Station(reading) => self.station_cache.insert(reading),

            // Point raster samples arriving over the bus behave like a gauge
            // with perfect local knowledge: keyed per grid cell so repeated
            // samples of the same area replace rather than accumulate.
            HazardObservation::Raster(sample) => {
                let cell = masfro_core::GridCell::of(sample.location);
                self.station_cache.insert(masfro_core::StationReading {
                    station: format!("raster@{},{}", cell.x, cell.y),
                    location: sample.location,
                    depth_m: Some(sample.depth_m),
                    rainfall_mm_1h: None,
                    confidence: 1.0,
                    observed_at: sample.observed_at,
                    ttl_seconds: sample.ttl_seconds,
                });
            }

            HazardObservation::Scout(report) => {
                let c = &report.classification;
                // Non-flood-related chatter carries no risk signal.
                if c.is_flood_related {
                    self.scout_cache.insert(
                        report.location,
                        c.severity,
                        c.confidence,
                        report.observed_at,
                        report.ttl_seconds,
                    );
                }
            }

            HazardObservation::Dam(reading) => self.scout_cache.insert(
                reading.location,
                reading.severity,
                reading.confidence,
                reading.observed_at,
                reading.ttl_seconds,
            ),

            HazardObservation::Scrape(snippet) => self.scout_cache.insert(
                snippet.location,
                snippet.severity,
                snippet.confidence,
                snippet.observed_at,
                snippet.ttl_seconds,
            ),
        }
        Ok(())
    }

    // ── Counters & cache access ───────────────────────────────────────────

    pub fn dropped_observations(&self) -> u64 {
        self.dropped_observations
    }

    pub fn raster_errors(&self) -> u64 {
        self.raster_errors
    }

    pub fn station_cache(&self) -> &StationCache {
        &self.station_cache
    }

    pub fn scout_cache(&self) -> &ScoutCache {
        &self.scout_cache
    }

    /// Drop all cached observations and rearm the full recompute.
    pub fn clear_caches(&mut self) {
        self.station_cache.clear();
        self.scout_cache.clear();
        self.first_pass_done = false;
    }

    // ── Recalculation pass ────────────────────────────────────────────────

    /// Recompute risk for every candidate edge and commit one batch update.
    ///
    /// On raster errors the pass degrades to station interpolation (counted,
    /// warned).  On a failed batch write the caches are left untouched and
    /// the error is returned; the next pass retries.
    pub fn recalculate(
        &mut self,
        graph: &GraphStore,
        spatial: &SpatialIndex,
        now: Timestamp,
    ) -> FusionResult<FusionSummary> {
        let started = Instant::now();

        self.station_cache.prune_expired(now);
        self.scout_cache.prune_expired(now);

        let candidates = self.candidate_edges(graph, spatial, now);

        // Copy current risks up front so the compute loop holds no graph lock.
        let current: Vec<f32> = {
            let snapshot = graph.snapshot();
            candidates.iter().map(|&e| snapshot.risk(e)).collect()
        };

        // Per-pass raster error latch so one dead provider logs once, not
        // once per edge.
        let mut raster_failed = false;

        let mut updates: FxHashMap<EdgeKey, f32> = FxHashMap::default();
        let mut risk_sum = 0.0f64;
        for (&edge, &old_risk) in candidates.iter().zip(&current) {
            let combined = self.edge_risk(graph, spatial, edge, now, &mut raster_failed);
            if (combined - old_risk).abs() > 1e-6 {
                updates.insert(graph.edge_key_of(edge), combined);
                risk_sum += combined as f64;
            }
        }

        let update_count = updates.len();
        let outcome = graph.batch_update_risks(&updates, now)?;
        self.first_pass_done = true;

        let summary = FusionSummary {
            edges_updated: outcome.applied,
            stations_used: self.station_cache.fresh(now).count(),
            reports_used: self.scout_cache.fresh_count(now),
            duration_ms: started.elapsed().as_secs_f64() * 1_000.0,
            average_risk: if update_count == 0 {
                0.0
            } else {
                (risk_sum / update_count as f64) as f32
            },
        };
        debug!(
            candidates = candidates.len(),
            edges_updated = summary.edges_updated,
            stations = summary.stations_used,
            reports = summary.reports_used,
            "fusion pass committed"
        );
        Ok(summary)
    }

    /// Edges that might have changed since the last pass.
    fn candidate_edges(
        &self,
        graph: &GraphStore,
        spatial: &SpatialIndex,
        now: Timestamp,
    ) -> Vec<EdgeId> {
        if !self.first_pass_done {
            return (0..graph.edge_count() as u32).map(EdgeId).collect();
        }

        let mut set: FxHashSet<EdgeId> = FxHashSet::default();

        // (a) Edges near a station with fresh data.
        for reading in self.station_cache.fresh(now) {
            if reading.depth_m.is_some() {
                set.extend(spatial.edges_within(reading.location, self.risk.radius_m));
            }
        }

        // (b) Edges inside the raster footprint while a scenario is active.
        if let (Some(raster), Some(_)) = (&self.raster, self.scenario)
            && let Some(bbox) = raster.footprint()
        {
            for edge in (0..graph.edge_count() as u32).map(EdgeId) {
                if bbox.contains(graph.edge_midpoint(edge)) {
                    set.insert(edge);
                }
            }
        }

        // (c) Edges near a fresh crowd signal.
        for signal in self.scout_cache.fresh(now) {
            set.extend(spatial.edges_within(signal.location, self.risk.report_radius_m));
        }

        // (d) Edges still carrying risk from earlier passes, so expired
        //     signals drain back to zero.
        {
            let snapshot = graph.snapshot();
            for edge in (0..graph.edge_count() as u32).map(EdgeId) {
                if snapshot.risk(edge) > 0.0 {
                    set.insert(edge);
                }
            }
        }

        set.into_iter().collect()
    }

    /// Combined risk for one edge at `now`.
    fn edge_risk(
        &mut self,
        graph: &GraphStore,
        spatial: &SpatialIndex,
        edge: EdgeId,
        now: Timestamp,
        raster_failed: &mut bool,
    ) -> f32 {
        let midpoint = graph.edge_midpoint(edge);

        // ── Depth: raster first, station interpolation as fallback ────────
        let depth = self
            .raster_depth(midpoint, raster_failed)
            .unwrap_or_else(|| self.interpolated_depth(midpoint, now));

        // ── Crowd signal within the report radius ─────────────────────────
        let signals = self
            .scout_cache
            .signals_near(midpoint, self.risk.report_radius_m, now);
        let crowd = if signals.is_empty() {
            0.0
        } else {
            let mean: f32 = signals
                .iter()
                .map(|s| {
                    let age = now.seconds_since(s.observed_at);
                    let decay =
                        masfro_risk::temporal_decay(1.0, age, self.risk.decay_half_life_scout_s);
                    s.severity * s.confidence * decay
                })
                .sum::<f32>()
                / signals.len() as f32;
            sigmoid(self.risk.crowd_steepness * (mean - self.risk.crowd_inflection))
        };
        let has_crowd = !signals.is_empty();

        // An edge with no live signal is clean: the river prior and the
        // class vulnerability amplify hazards, they do not originate them.
        if depth <= 0.0 && !has_crowd {
            return 0.0;
        }

        let hydro = masfro_risk::depth_to_risk(depth);
        let (u, v) = graph.edge_endpoints(edge);
        let river_prior = spatial.river_risk(u).max(spatial.river_risk(v));
        let infra = masfro_risk::infrastructure_risk(graph.edge_class(edge), depth);

        let w = self.risk.weights;
        (w.depth * hydro.max(river_prior * 0.5) + w.crowd * crowd + w.historical * infra)
            .clamp(0.0, 1.0)
    }

    /// Depth at `point` from the active raster scenario, or `None` to fall
    /// back to station interpolation.
    fn raster_depth(&mut self, point: GeoPoint, raster_failed: &mut bool) -> Option<f32> {
        let (raster, (period, step)) = match (&self.raster, self.scenario) {
            (Some(r), Some(s)) => (r, s),
            _ => return None,
        };
        match raster.depth_at(period, step, point) {
            Ok(depth) => depth,
            Err(e) => {
                self.raster_errors += 1;
                if !*raster_failed {
                    warn!(error = %e, "raster read failed; falling back to station interpolation");
                    *raster_failed = true;
                }
                None
            }
        }
    }

    /// Inverse-distance-weighted depth from the nearest fresh stations
    /// within the risk radius, each decayed by its reading's age.
    fn interpolated_depth(&self, point: GeoPoint, now: Timestamp) -> f32 {
        let mut contributors: Vec<(f32, f32)> = self
            .station_cache
            .fresh(now)
            .filter_map(|reading| {
                let depth = reading.depth_m?;
                let distance = point.distance_m(reading.location);
                (distance <= self.risk.radius_m).then(|| {
                    let age = now.seconds_since(reading.observed_at);
                    let decay = masfro_risk::temporal_decay(
                        1.0,
                        age,
                        self.risk.decay_half_life_station_s,
                    );
                    (distance.max(1.0), depth * decay)
                })
            })
            .collect();

        if contributors.is_empty() {
            return 0.0;
        }

        contributors.sort_by(|a, b| a.0.total_cmp(&b.0));
        contributors.truncate(IDW_STATIONS);

        let mut weight_sum = 0.0f32;
        let mut depth_sum = 0.0f32;
        for (distance, depth) in contributors {
            let w = 1.0 / distance;
            weight_sum += w;
            depth_sum += w * depth;
        }
        depth_sum / weight_sum
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
