//! The `RoutingEngine`: snapping, the relaxation ladder, and the baseline.

use std::sync::Arc;

use tracing::{debug, info};

use masfro_core::{
    ComputedRoute, GeoPoint, NodeId, RouteMode, RoutePreferences, RouteWarning, RoutingConfig,
    SimClock, WarningSeverity,
};
use masfro_graph::GraphStore;
use masfro_spatial::SpatialIndex;

use crate::astar::{astar, SearchResult};
use crate::error::{RoutingError, RoutingResult};
use crate::metrics::path_metrics;

/// Risk-aware routing over the shared graph.
///
/// Stateless between requests: every query snapshots the graph once and
/// computes everything from that coherent view.
pub struct RoutingEngine {
    graph: Arc<GraphStore>,
    spatial: Arc<SpatialIndex>,
    config: RoutingConfig,
    clock: Arc<SimClock>,
}

impl RoutingEngine {
    pub fn new(
        graph: Arc<GraphStore>,
        spatial: Arc<SpatialIndex>,
        config: RoutingConfig,
        clock: Arc<SimClock>,
    ) -> Self {
        Self { graph, spatial, config, clock }
    }

    pub fn graph(&self) -> &Arc<GraphStore> {
        &self.graph
    }

    // ── Public queries ────────────────────────────────────────────────────

    /// Compute a route between two coordinates under the given preferences.
    pub fn compute_route(
        &self,
        start: GeoPoint,
        end: GeoPoint,
        preferences: &RoutePreferences,
    ) -> RoutingResult<ComputedRoute> {
        if self.graph.is_empty() {
            return Err(RoutingError::Unavailable);
        }

        let from = self.snap(start, "start")?;
        let to = self.snap(end, "end")?;

        let penalty = self.mode_penalty(preferences);
        let route = self.search_with_relaxation(from, to, penalty, preferences.max_risk_threshold)?;

        debug!(
            nodes = route.nodes.len(),
            distance_m = route.metrics.total_distance_m,
            max_risk = route.metrics.max_risk,
            relaxed = ?route.relaxed_threshold,
            "route computed"
        );
        Ok(route)
    }

    /// Distance-only A* with no risk threshold.  Used for validation and
    /// offline comparison; emits the same metrics so path-risk statistics
    /// can be computed post-hoc.
    pub fn baseline_route(&self, start: GeoPoint, end: GeoPoint) -> RoutingResult<ComputedRoute> {
        if self.graph.is_empty() {
            return Err(RoutingError::Unavailable);
        }
        let from = self.snap(start, "start")?;
        let to = self.snap(end, "end")?;

        let result = self
            .run_search(from, to, 0.0, f32::INFINITY)?
            .ok_or(RoutingError::NoPath)?;
        Ok(self.finish(result, None))
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Snap a query coordinate to its nearest node, bounded by the
    /// configured maximum snap distance.
    fn snap(&self, point: GeoPoint, which: &'static str) -> RoutingResult<NodeId> {
        let (node, distance_m) = self
            .spatial
            .nearest_node(point)
            .ok_or(RoutingError::Unavailable)?;
        if distance_m > self.config.max_snap_m {
            return Err(RoutingError::NotFound {
                which,
                distance_m,
                max_m: self.config.max_snap_m,
            });
        }
        Ok(node)
    }

    fn mode_penalty(&self, preferences: &RoutePreferences) -> f64 {
        if !preferences.avoid_floods {
            return self.config.penalty_fastest;
        }
        match preferences.mode {
            RouteMode::Safest => self.config.penalty_safest,
            RouteMode::Balanced => self.config.penalty_balanced,
            RouteMode::Fastest => self.config.penalty_fastest,
        }
    }

    /// Try the requested threshold, then the configured relaxation ladder.
    fn search_with_relaxation(
        &self,
        from: NodeId,
        to: NodeId,
        penalty: f64,
        threshold: f32,
    ) -> RoutingResult<ComputedRoute> {
        if let Some(result) = self.run_search(from, to, penalty, threshold)? {
            return Ok(self.finish(result, None));
        }
        if !self.config.relax_on_failure {
            return Err(RoutingError::NoPath);
        }

        let mut ladder = Vec::new();
        if threshold < 0.99 {
            ladder.push(0.99);
        }
        ladder.push(f32::INFINITY);

        for relaxed in ladder {
            if let Some(result) = self.run_search(from, to, penalty, relaxed)? {
                info!(threshold = relaxed, "route found after threshold relaxation");
                return Ok(self.finish(result, Some(relaxed)));
            }
        }
        Err(RoutingError::NoPath)
    }

    fn run_search(
        &self,
        from: NodeId,
        to: NodeId,
        penalty: f64,
        threshold: f32,
    ) -> RoutingResult<Option<SearchResult>> {
        let deadline = self
            .clock
            .now()
            .plus_secs(self.config.deadline_ms as f64 / 1_000.0);
        let snapshot = self.graph.snapshot();
        astar(&snapshot, from, to, penalty, threshold, &self.clock, deadline)
    }

    /// Assemble the route DTO: coordinates, metrics, warnings.
    fn finish(&self, result: SearchResult, relaxed: Option<f32>) -> ComputedRoute {
        let snapshot = self.graph.snapshot();
        let (metrics, mut warnings) = path_metrics(&snapshot, &result.edges);
        drop(snapshot);

        if let Some(threshold) = relaxed {
            let message = if threshold.is_finite() {
                format!("max-risk threshold relaxed to {threshold:.2}")
            } else {
                "max-risk threshold ignored to find any path".to_string()
            };
            warnings.push(RouteWarning::new(WarningSeverity::Caution, message));
        }

        let coordinates = result
            .nodes
            .iter()
            .map(|&n| self.graph.node_position(n))
            .collect();

        ComputedRoute {
            nodes: result.nodes,
            coordinates,
            metrics,
            warnings,
            relaxed_threshold: relaxed,
        }
    }
}
