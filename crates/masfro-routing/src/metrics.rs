//! Path metrics, computed in one sweep over the chosen edges.

use masfro_core::{EdgeId, PathMetrics, RouteWarning, WarningSeverity};
use masfro_graph::GraphSnapshot;

/// Segment risk at or above this adds a danger warning to the route.
const HIGH_RISK_WARNING: f32 = 0.7;

/// Compute metrics and risk warnings for a path given as its edge sequence.
///
/// Travel time applies the risk slowdown curve per segment: a dry detour and
/// one flooded block are costed individually rather than smearing one
/// average over the whole route.
pub fn path_metrics(
    snapshot: &GraphSnapshot<'_>,
    edges: &[EdgeId],
) -> (PathMetrics, Vec<RouteWarning>) {
    let mut metrics = PathMetrics { num_segments: edges.len(), ..PathMetrics::default() };
    let mut warnings = Vec::new();
    let mut weighted_risk = 0.0f64;
    let mut minutes = 0.0f64;

    for &edge in edges {
        let length = snapshot.length_m(edge);
        let risk = snapshot.risk(edge);

        metrics.total_distance_m += length;
        weighted_risk += (risk * length) as f64;

        if risk > metrics.max_risk {
            metrics.max_risk = risk;
        }
        if risk >= 0.6 {
            metrics.high_risk_segments += 1;
        }
        if risk >= 0.9 {
            metrics.critical_risk_segments += 1;
        }

        // Base minutes at free-flow speed, then the risk slowdown curve.
        let base_minutes = length / (snapshot.base_speed_kmh(edge) * 1_000.0 / 60.0);
        minutes += masfro_risk::travel_time_adjustment(base_minutes, risk) as f64;

        if risk >= HIGH_RISK_WARNING {
            let (u, v) = (snapshot.edge_from(edge), snapshot.edge_to(edge));
            let midpoint = snapshot
                .node_position(u)
                .midpoint(snapshot.node_position(v));
            warnings.push(RouteWarning::at(
                WarningSeverity::Danger,
                format!("high flood risk on segment ({:.2})", risk),
                midpoint,
            ));
        }
    }

    if metrics.total_distance_m > 0.0 {
        metrics.average_risk = (weighted_risk / metrics.total_distance_m as f64) as f32;
    }
    metrics.estimated_time_minutes = minutes as f32;

    (metrics, warnings)
}
