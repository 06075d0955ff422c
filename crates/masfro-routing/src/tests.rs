//! Unit tests for masfro-routing.
//!
//! Test graphs declare edge lengths slightly above the straight-line
//! distance between their node coordinates, keeping the haversine heuristic
//! admissible exactly as it is on real road data.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use masfro_core::{
        BoundingBox, EdgeKey, GeoPoint, HighwayClass, NodeId, RoutingConfig, SimClock, Timestamp,
    };
    use masfro_graph::{GraphBuilder, GraphStore};
    use masfro_spatial::SpatialIndex;

    use crate::RoutingEngine;

    pub fn bbox() -> BoundingBox {
        BoundingBox::new(14.58, 14.78, 121.05, 121.18)
    }

    /// Triangle: 0 → 1 → 2 (110 m legs) plus a direct 0 → 2 (250 m).
    /// Node spacing is ~108 m so declared lengths stay ≥ straight-line.
    pub fn triangle() -> (Arc<GraphStore>, [NodeId; 3]) {
        let mut b = GraphBuilder::new(bbox());
        let n0 = b.add_node(0, GeoPoint::new(14.65, 121.100), 2).unwrap();
        let n1 = b.add_node(1, GeoPoint::new(14.65, 121.101), 2).unwrap();
        let n2 = b.add_node(2, GeoPoint::new(14.65, 121.102), 2).unwrap();
        b.add_edge(n0, n1, 110.0, HighwayClass::Residential).unwrap();
        b.add_edge(n1, n2, 110.0, HighwayClass::Residential).unwrap();
        b.add_edge(n0, n2, 250.0, HighwayClass::Secondary).unwrap();
        (Arc::new(b.build(2_000.0)), [n0, n1, n2])
    }

    /// Two nodes with parallel edges k=0 and k=1.
    pub fn parallel() -> (Arc<GraphStore>, [NodeId; 2]) {
        let mut b = GraphBuilder::new(bbox());
        let n0 = b.add_node(0, GeoPoint::new(14.65, 121.100), 1).unwrap();
        let n1 = b.add_node(1, GeoPoint::new(14.65, 121.101), 1).unwrap();
        b.add_edge(n0, n1, 110.0, HighwayClass::Primary).unwrap();
        b.add_edge(n0, n1, 110.0, HighwayClass::Primary).unwrap();
        (Arc::new(b.build(2_000.0)), [n0, n1])
    }

    pub fn engine(graph: &Arc<GraphStore>) -> RoutingEngine {
        engine_with(graph, RoutingConfig::default())
    }

    pub fn engine_with(graph: &Arc<GraphStore>, config: RoutingConfig) -> RoutingEngine {
        let spatial = Arc::new(SpatialIndex::build(graph, &[]));
        RoutingEngine::new(graph.clone(), spatial, config, Arc::new(SimClock::new()))
    }

    pub fn set_risk(graph: &GraphStore, u: NodeId, v: NodeId, k: u8, risk: f32) {
        graph
            .update_edge_risk(EdgeKey::new(u, v, k), risk, Timestamp(0.0))
            .unwrap();
    }

    pub fn point_of(graph: &GraphStore, node: NodeId) -> GeoPoint {
        graph.node_position(node)
    }
}

// ── Basic search ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod search {
    use masfro_core::RoutePreferences;
    use masfro_graph::GraphStore;
    use std::sync::Arc;

    use super::helpers;
    use crate::RoutingError;

    #[test]
    fn shortest_path_on_clean_graph() {
        let (graph, [n0, n1, n2]) = helpers::triangle();
        let engine = helpers::engine(&graph);

        let route = engine
            .compute_route(
                helpers::point_of(&graph, n0),
                helpers::point_of(&graph, n2),
                &RoutePreferences::default(),
            )
            .unwrap();

        // 110 + 110 beats the 250 m direct edge.
        assert_eq!(route.nodes, vec![n0, n1, n2]);
        assert_eq!(route.metrics.num_segments, 2);
        assert!((route.metrics.total_distance_m - 220.0).abs() < 0.1);
        assert_eq!(route.metrics.max_risk, 0.0);
        assert!(route.warnings.is_empty());
        assert_eq!(route.coordinates.len(), 3);
    }

    #[test]
    fn start_equals_end_is_single_node() {
        let (graph, [n0, ..]) = helpers::triangle();
        let engine = helpers::engine(&graph);
        let p = helpers::point_of(&graph, n0);

        let route = engine.compute_route(p, p, &RoutePreferences::default()).unwrap();
        assert_eq!(route.nodes.len(), 1);
        assert_eq!(route.metrics.total_distance_m, 0.0);
        assert_eq!(route.metrics.average_risk, 0.0);
        assert_eq!(route.metrics.num_segments, 0);
    }

    #[test]
    fn empty_graph_is_unavailable() {
        let graph = Arc::new(GraphStore::empty());
        let engine = helpers::engine(&graph);
        let p = masfro_core::GeoPoint::new(14.65, 121.10);
        assert!(matches!(
            engine.compute_route(p, p, &RoutePreferences::default()),
            Err(RoutingError::Unavailable)
        ));
    }

    #[test]
    fn far_endpoint_is_not_found() {
        let (graph, [n0, ..]) = helpers::triangle();
        let engine = helpers::engine(&graph);

        // ~2.2 km east of the easternmost node; max snap is 500 m.
        let far = masfro_core::GeoPoint::new(14.65, 121.122);
        let err = engine
            .compute_route(helpers::point_of(&graph, n0), far, &RoutePreferences::default())
            .unwrap_err();
        assert!(matches!(err, RoutingError::NotFound { which: "end", .. }));
    }

    #[test]
    fn disconnected_endpoints_are_no_path() {
        use masfro_core::{GeoPoint, HighwayClass};
        use masfro_graph::GraphBuilder;

        let mut b = GraphBuilder::new(helpers::bbox());
        let a = b.add_node(0, GeoPoint::new(14.65, 121.100), 1).unwrap();
        let c = b.add_node(1, GeoPoint::new(14.65, 121.101), 1).unwrap();
        let d = b.add_node(2, GeoPoint::new(14.65, 121.103), 1).unwrap();
        let e = b.add_node(3, GeoPoint::new(14.65, 121.104), 1).unwrap();
        b.add_edge(a, c, 110.0, HighwayClass::Primary).unwrap();
        b.add_edge(d, e, 110.0, HighwayClass::Primary).unwrap();
        let graph = Arc::new(b.build(2_000.0));
        let engine = helpers::engine(&graph);

        let err = engine
            .compute_route(
                helpers::point_of(&graph, a),
                helpers::point_of(&graph, e),
                &RoutePreferences::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RoutingError::NoPath));
    }
}

// ── Risk-aware behavior ───────────────────────────────────────────────────────

#[cfg(test)]
mod risk_aware {
    use masfro_core::{RouteMode, RoutePreferences};

    use super::helpers;

    #[test]
    fn safest_detours_around_flooded_segment() {
        let (graph, [n0, n1, n2]) = helpers::triangle();
        helpers::set_risk(&graph, n1, n2, 0, 0.9);
        let engine = helpers::engine(&graph);

        let prefs = RoutePreferences { mode: RouteMode::Safest, ..Default::default() };
        let route = engine
            .compute_route(
                helpers::point_of(&graph, n0),
                helpers::point_of(&graph, n2),
                &prefs,
            )
            .unwrap();

        // Longer but clean direct edge wins under the safety penalty.
        assert_eq!(route.nodes, vec![n0, n2]);
        assert_eq!(route.metrics.max_risk, 0.0);
    }

    #[test]
    fn fastest_ignores_risk_but_warns() {
        let (graph, [n0, n1, n2]) = helpers::triangle();
        helpers::set_risk(&graph, n1, n2, 0, 0.9);
        let engine = helpers::engine(&graph);

        let prefs = RoutePreferences { mode: RouteMode::Fastest, ..Default::default() };
        let route = engine
            .compute_route(
                helpers::point_of(&graph, n0),
                helpers::point_of(&graph, n2),
                &prefs,
            )
            .unwrap();

        assert_eq!(route.nodes, vec![n0, n1, n2]);
        assert_eq!(route.metrics.max_risk, 0.9);
        assert!(
            route.warnings.iter().any(|w| w.message.contains("high flood risk")),
            "risky fastest route must carry a warning"
        );
    }

    #[test]
    fn avoid_floods_false_degrades_to_distance() {
        let (graph, [n0, n1, n2]) = helpers::triangle();
        helpers::set_risk(&graph, n1, n2, 0, 0.9);
        let engine = helpers::engine(&graph);

        let prefs = RoutePreferences {
            mode: RouteMode::Safest,
            avoid_floods: false,
            ..Default::default()
        };
        let route = engine
            .compute_route(
                helpers::point_of(&graph, n0),
                helpers::point_of(&graph, n2),
                &prefs,
            )
            .unwrap();
        assert_eq!(route.nodes, vec![n0, n1, n2]);
    }

    #[test]
    fn baseline_matches_fastest_distance() {
        let (graph, [n0, _, n2]) = helpers::triangle();
        helpers::set_risk(&graph, n0, n2, 0, 0.4);
        let engine = helpers::engine(&graph);

        let start = helpers::point_of(&graph, n0);
        let end = helpers::point_of(&graph, n2);

        let fastest = engine
            .compute_route(
                start,
                end,
                &RoutePreferences { mode: masfro_core::RouteMode::Fastest, ..Default::default() },
            )
            .unwrap();
        let baseline = engine.baseline_route(start, end).unwrap();

        assert_eq!(fastest.metrics.total_distance_m, baseline.metrics.total_distance_m);
        assert_eq!(fastest.nodes, baseline.nodes);
    }

    #[test]
    fn travel_time_rises_with_risk() {
        let (graph, [n0, n1, n2]) = helpers::triangle();
        let engine = helpers::engine(&graph);
        let start = helpers::point_of(&graph, n0);
        let end = helpers::point_of(&graph, n2);
        let prefs = RoutePreferences { mode: RouteMode::Fastest, ..Default::default() };

        let dry = engine.compute_route(start, end, &prefs).unwrap();
        helpers::set_risk(&graph, n0, n1, 0, 0.8);
        helpers::set_risk(&graph, n1, n2, 0, 0.8);
        let flooded = engine.compute_route(start, end, &prefs).unwrap();

        assert_eq!(dry.nodes, flooded.nodes);
        assert!(flooded.metrics.estimated_time_minutes > dry.metrics.estimated_time_minutes);
    }
}

// ── Parallel edges & threshold relaxation ─────────────────────────────────────

#[cfg(test)]
mod parallel_edges {
    use masfro_core::{RoutePreferences, RoutingConfig};

    use super::helpers;
    use crate::RoutingError;

    #[test]
    fn effective_weight_is_min_over_keys() {
        let (graph, [n0, n1]) = helpers::parallel();
        helpers::set_risk(&graph, n0, n1, 0, 0.95); // impassable at threshold
        helpers::set_risk(&graph, n0, n1, 1, 0.1);
        let engine = helpers::engine(&graph);

        let route = engine
            .compute_route(
                helpers::point_of(&graph, n0),
                helpers::point_of(&graph, n1),
                &RoutePreferences::default(),
            )
            .unwrap();
        assert_eq!(route.nodes, vec![n0, n1]);
        assert_eq!(route.metrics.max_risk, 0.1); // traversed the clean key
        assert!(route.relaxed_threshold.is_none());
    }

    #[test]
    fn all_keys_blocked_is_no_path_without_relaxation() {
        let (graph, [n0, n1]) = helpers::parallel();
        helpers::set_risk(&graph, n0, n1, 0, 0.95);
        helpers::set_risk(&graph, n0, n1, 1, 0.95);
        let config = RoutingConfig { relax_on_failure: false, ..Default::default() };
        let engine = helpers::engine_with(&graph, config);

        let err = engine
            .compute_route(
                helpers::point_of(&graph, n0),
                helpers::point_of(&graph, n1),
                &RoutePreferences::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RoutingError::NoPath));
    }

    #[test]
    fn relaxation_ladder_recovers_with_warning() {
        let (graph, [n0, n1]) = helpers::parallel();
        helpers::set_risk(&graph, n0, n1, 0, 0.95);
        helpers::set_risk(&graph, n0, n1, 1, 0.95);
        let engine = helpers::engine(&graph);

        let route = engine
            .compute_route(
                helpers::point_of(&graph, n0),
                helpers::point_of(&graph, n1),
                &RoutePreferences::default(),
            )
            .unwrap();
        assert_eq!(route.relaxed_threshold, Some(0.99));
        assert!(route.warnings.iter().any(|w| w.message.contains("relaxed")));
    }
}

// ── Deadline ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod deadline {
    use masfro_core::{SimClock, Timestamp};

    use super::helpers;
    use crate::astar::astar;
    use crate::RoutingError;

    #[test]
    fn expired_deadline_aborts_on_first_pop() {
        let (graph, [n0, _, n2]) = helpers::triangle();
        let clock = SimClock::new();
        let snapshot = graph.snapshot();

        let past = Timestamp(clock.now().0 - 1.0);
        let err = astar(&snapshot, n0, n2, 0.0, f32::INFINITY, &clock, past).unwrap_err();
        assert!(matches!(err, RoutingError::DeadlineExceeded));
    }
}

// ── Evacuation-center selection ───────────────────────────────────────────────

#[cfg(test)]
mod evacuation {
    use std::sync::Arc;

    use masfro_core::{
        EvacuationCenter, EvacuationRepository, GeoPoint, OccupancyStatistics, RepositoryError,
        RoutePreferences, Timestamp,
    };

    use super::helpers;
    use crate::RoutingError;

    struct FixedRepo(Vec<EvacuationCenter>);

    impl EvacuationRepository for FixedRepo {
        fn get_all(&self) -> Result<Vec<EvacuationCenter>, RepositoryError> {
            Ok(self.0.clone())
        }
        fn get_by_name(&self, name: &str) -> Result<Option<EvacuationCenter>, RepositoryError> {
            Ok(self.0.iter().find(|c| c.name == name).cloned())
        }
        fn update_occupancy(&self, _: &str, _: u32, _: &str) -> Result<(), RepositoryError> {
            Ok(())
        }
        fn add_evacuees(&self, _: &str, _: u32) -> Result<u32, RepositoryError> {
            Ok(0)
        }
        fn reset_all(&self) -> Result<(), RepositoryError> {
            Ok(())
        }
        fn statistics(&self) -> Result<OccupancyStatistics, RepositoryError> {
            Ok(OccupancyStatistics::default())
        }
    }

    fn center(name: &str, at: GeoPoint, active: bool, occupancy: u32) -> EvacuationCenter {
        EvacuationCenter {
            id: 1,
            name: name.into(),
            location: at,
            capacity: 100,
            current_occupancy: occupancy,
            center_type: "school".into(),
            barangay: "malanday".into(),
            contact: None,
            facilities: vec!["water".into(), "medical".into()],
            is_active: active,
            updated_at: Timestamp(0.0),
        }
    }

    #[test]
    fn picks_reachable_center_and_sorts_alternatives() {
        let (graph, [n0, n1, n2]) = helpers::triangle();
        let engine = helpers::engine(&graph);
        let repo = FixedRepo(vec![
            center("near-hall", helpers::point_of(&graph, n1), true, 10),
            center("far-gym", helpers::point_of(&graph, n2), true, 10),
        ]);

        let choice = engine
            .nearest_evacuation_center(
                helpers::point_of(&graph, n0),
                &repo,
                None,
                5,
                &RoutePreferences::default(),
            )
            .unwrap();

        assert_eq!(choice.best.center.name, "near-hall");
        assert_eq!(choice.alternatives.len(), 1);
        assert!(choice.best.score <= choice.alternatives[0].score);
        assert!(choice.best.route.metrics.total_distance_m > 0.0);
    }

    #[test]
    fn inactive_and_full_centers_filtered() {
        let (graph, [n0, n1, n2]) = helpers::triangle();
        let engine = helpers::engine(&graph);
        let repo = FixedRepo(vec![
            center("closed", helpers::point_of(&graph, n1), false, 10),
            center("packed", helpers::point_of(&graph, n1), true, 100),
            center("open", helpers::point_of(&graph, n2), true, 10),
        ]);

        let choice = engine
            .nearest_evacuation_center(
                helpers::point_of(&graph, n0),
                &repo,
                None,
                5,
                &RoutePreferences::default(),
            )
            .unwrap();
        assert_eq!(choice.best.center.name, "open");
        assert!(choice.alternatives.is_empty());
    }

    #[test]
    fn no_usable_centers_is_typed_error() {
        let (graph, [n0, ..]) = helpers::triangle();
        let engine = helpers::engine(&graph);
        let repo = FixedRepo(vec![]);

        let err = engine
            .nearest_evacuation_center(
                helpers::point_of(&graph, n0),
                &repo,
                None,
                5,
                &RoutePreferences::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RoutingError::NoCenters));
    }

    #[test]
    fn query_is_pass_through_and_never_reorders() {
        let (graph, [n0, n1, n2]) = helpers::triangle();
        let engine = helpers::engine(&graph);
        let mut gym = center("riverbanks-gym", helpers::point_of(&graph, n2), true, 10);
        gym.center_type = "gymnasium".into();
        let repo = FixedRepo(vec![
            center("school-a", helpers::point_of(&graph, n1), true, 10),
            gym,
        ]);

        // Selection is 0.6·risk + 0.4·normalized distance, nothing else: a
        // query naming the farther center must not change the outcome.
        let plain = engine
            .nearest_evacuation_center(
                helpers::point_of(&graph, n0),
                &repo,
                None,
                5,
                &RoutePreferences::default(),
            )
            .unwrap();
        let hinted = engine
            .nearest_evacuation_center(
                helpers::point_of(&graph, n0),
                &repo,
                Some("need the gymnasium please"),
                5,
                &RoutePreferences::default(),
            )
            .unwrap();

        assert_eq!(plain.best.center.name, "school-a");
        assert_eq!(hinted.best.center.name, plain.best.center.name);
        assert_eq!(hinted.best.score, plain.best.score);
    }
}
