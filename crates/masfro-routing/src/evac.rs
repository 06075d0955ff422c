//! Nearest-evacuation-center selection.
//!
//! Candidates come from the repository snapshot (active, with free space),
//! are pre-ranked by straight-line distance, routed individually, and scored
//! by a weighted sum of route risk and normalized route distance.

use tracing::{debug, warn};

use masfro_core::{
    EvacuationCenter, EvacuationChoice, EvacuationRepository, GeoPoint, RankedCenter,
    RoutePreferences,
};

use crate::engine::RoutingEngine;
use crate::error::{RoutingError, RoutingResult};

/// Score weights: route risk dominates, distance breaks ties.
const RISK_WEIGHT: f32 = 0.6;
const DISTANCE_WEIGHT: f32 = 0.4;

impl RoutingEngine {
    /// Select the best evacuation center for `location`.
    ///
    /// Returns the chosen center with its route plus the remaining routed
    /// candidates sorted by the same metric.  `query` does not influence the
    /// ranking; it travels with the request for logging and the mission's
    /// explanation.
    pub fn nearest_evacuation_center(
        &self,
        location: GeoPoint,
        repository: &dyn EvacuationRepository,
        query: Option<&str>,
        max_candidates: usize,
        preferences: &RoutePreferences,
    ) -> RoutingResult<EvacuationChoice> {
        let mut centers: Vec<EvacuationCenter> = repository
            .get_all()?
            .into_iter()
            .filter(|c| c.is_active && c.has_space())
            .collect();
        if centers.is_empty() {
            return Err(RoutingError::NoCenters);
        }

        // Pre-rank by straight-line distance and route only the short list.
        centers.sort_by(|a, b| {
            location
                .distance_m(a.location)
                .total_cmp(&location.distance_m(b.location))
        });
        centers.truncate(max_candidates.max(1));

        let mut ranked: Vec<RankedCenter> = Vec::with_capacity(centers.len());
        for center in centers {
            match self.compute_route(location, center.location, preferences) {
                Ok(route) => ranked.push(RankedCenter { center, route, score: 0.0 }),
                Err(e) => {
                    warn!(center = %center.name, error = %e, "candidate center unroutable");
                }
            }
        }
        if ranked.is_empty() {
            return Err(RoutingError::NoCenters);
        }

        // Normalize distance against the farthest routed candidate.
        let max_distance = ranked
            .iter()
            .map(|r| r.route.metrics.total_distance_m)
            .fold(0.0f32, f32::max);

        for candidate in &mut ranked {
            let normalized = if max_distance > 0.0 {
                candidate.route.metrics.total_distance_m / max_distance
            } else {
                0.0
            };
            candidate.score =
                RISK_WEIGHT * candidate.route.metrics.average_risk + DISTANCE_WEIGHT * normalized;
        }

        ranked.sort_by(|a, b| a.score.total_cmp(&b.score));
        let best = ranked.remove(0);
        debug!(
            center = %best.center.name,
            score = best.score,
            query = query.unwrap_or(""),
            alternatives = ranked.len(),
            "evacuation center selected"
        );
        Ok(EvacuationChoice { best, alternatives: ranked })
    }
}
