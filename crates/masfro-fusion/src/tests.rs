//! Unit tests for masfro-fusion.

#[cfg(test)]
mod helpers {
    use masfro_core::{
        BoundingBox, GeoPoint, HazardObservation, HighwayClass, NodeId, ReportType,
        ScoutClassification, ScoutReport, StationReading, Timestamp,
    };
    use masfro_graph::{GraphBuilder, GraphStore};
    use masfro_spatial::SpatialIndex;

    /// Line graph 0 → 1 → 2 with ~1.08 km segments, so segment midpoints are
    /// far outside each other's 200 m report radius and 800 m station radius.
    pub fn graph_and_index() -> (GraphStore, SpatialIndex, [NodeId; 3]) {
        let bbox = BoundingBox::new(14.58, 14.78, 121.05, 121.18);
        let mut b = GraphBuilder::new(bbox);
        let n0 = b.add_node(0, GeoPoint::new(14.65, 121.10), 1).unwrap();
        let n1 = b.add_node(1, GeoPoint::new(14.65, 121.11), 2).unwrap();
        let n2 = b.add_node(2, GeoPoint::new(14.65, 121.12), 1).unwrap();
        b.add_edge(n0, n1, 1_080.0, HighwayClass::Residential).unwrap();
        b.add_edge(n1, n2, 1_080.0, HighwayClass::Residential).unwrap();
        let store = b.build(2_000.0);
        let index = SpatialIndex::build(&store, &[]);
        (store, index, [n0, n1, n2])
    }

    /// Midpoint of the second segment (1 → 2).
    pub fn second_segment_midpoint() -> GeoPoint {
        GeoPoint::new(14.65, 121.115)
    }

    pub fn scout_report(at: GeoPoint, severity: f32, confidence: f32, t: f64) -> HazardObservation {
        HazardObservation::Scout(ScoutReport {
            location: at,
            text: Some("kalsada baha na".into()),
            image_ref: None,
            classification: ScoutClassification {
                is_flood_related: true,
                report_type: ReportType::Flooding,
                severity,
                confidence,
            },
            observed_at: Timestamp(t),
            ttl_seconds: 3_600,
        })
    }

    pub fn station(name: &str, at: GeoPoint, depth: f32, t: f64) -> HazardObservation {
        HazardObservation::Station(StationReading {
            station: name.into(),
            location: at,
            depth_m: Some(depth),
            rainfall_mm_1h: None,
            confidence: 1.0,
            observed_at: Timestamp(t),
            ttl_seconds: 3_600,
        })
    }
}

// ── Caches ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod caches {
    use masfro_core::{GeoPoint, Timestamp};

    use crate::cache::{ScoutCache, StationCache};

    fn reading(name: &str, t: f64) -> masfro_core::StationReading {
        masfro_core::StationReading {
            station: name.into(),
            location: GeoPoint::new(14.65, 121.10),
            depth_m: Some(0.2),
            rainfall_mm_1h: None,
            confidence: 1.0,
            observed_at: Timestamp(t),
            ttl_seconds: 3_600,
        }
    }

    #[test]
    fn station_cache_keeps_latest_per_station() {
        let mut cache = StationCache::new(10);
        cache.insert(reading("nangka", 0.0));
        cache.insert(reading("nangka", 5.0));
        assert_eq!(cache.len(), 1);
        let fresh: Vec<_> = cache.fresh(Timestamp(10.0)).collect();
        assert_eq!(fresh[0].observed_at, Timestamp(5.0));
    }

    #[test]
    fn station_cache_evicts_lru_on_overflow() {
        let mut cache = StationCache::new(2);
        cache.insert(reading("a", 0.0));
        cache.insert(reading("b", 1.0));
        cache.insert(reading("c", 2.0)); // evicts "a"
        assert_eq!(cache.len(), 2);
        let names: Vec<_> = cache.fresh(Timestamp(3.0)).map(|r| r.station.clone()).collect();
        assert!(!names.contains(&"a".to_string()));
    }

    #[test]
    fn station_cache_prunes_expired() {
        let mut cache = StationCache::new(10);
        cache.insert(reading("old", 0.0));
        cache.prune_expired(Timestamp(3_600.0));
        assert!(cache.is_empty());
    }

    #[test]
    fn scout_cache_global_cap_evicts_oldest() {
        let mut cache = ScoutCache::new(2);
        let p = GeoPoint::new(14.65, 121.10);
        cache.insert(p, 0.5, 1.0, Timestamp(0.0), 3_600);
        cache.insert(p, 0.6, 1.0, Timestamp(1.0), 3_600);
        cache.insert(p, 0.7, 1.0, Timestamp(2.0), 3_600);
        assert_eq!(cache.len(), 2);
        let severities: Vec<f32> = cache
            .signals_near(p, 50.0, Timestamp(3.0))
            .iter()
            .map(|s| s.severity)
            .collect();
        assert!(!severities.contains(&0.5));
    }

    #[test]
    fn scout_cache_radius_filter_is_exact() {
        let mut cache = ScoutCache::new(10);
        let origin = GeoPoint::new(14.65, 121.10);
        let near = GeoPoint::new(14.6512, 121.10); // ~130 m north
        let far = GeoPoint::new(14.6550, 121.10); // ~550 m north
        cache.insert(near, 0.5, 1.0, Timestamp(0.0), 3_600);
        cache.insert(far, 0.5, 1.0, Timestamp(0.0), 3_600);

        assert_eq!(cache.signals_near(origin, 200.0, Timestamp(1.0)).len(), 1);
        assert_eq!(cache.signals_near(origin, 600.0, Timestamp(1.0)).len(), 2);
    }
}

// ── Fusion pass ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod pass {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use masfro_core::{CacheConfig, EdgeId, EdgeKey, GeoPoint, RiskConfig, Timestamp};
    use masfro_graph::GraphListener;

    use super::helpers;
    use crate::HazardFusion;

    struct BatchCounter(AtomicUsize);

    impl GraphListener for BatchCounter {
        fn on_risk_batch(&self, _generation: u64, _changed: &[EdgeId]) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fusion() -> HazardFusion {
        HazardFusion::new(RiskConfig::default(), &CacheConfig::default())
    }

    #[test]
    fn empty_inputs_leave_all_risks_zero() {
        let (graph, spatial, _) = helpers::graph_and_index();
        let mut fusion = fusion();

        let summary = fusion.recalculate(&graph, &spatial, Timestamp(0.0)).unwrap();
        assert_eq!(summary.edges_updated, 0);
        assert_eq!(graph.risk_statistics().nonzero, 0);
    }

    #[test]
    fn single_report_raises_only_nearby_edge() {
        let (graph, spatial, [n0, n1, n2]) = helpers::graph_and_index();
        let mut fusion = fusion();

        fusion
            .ingest(
                helpers::scout_report(helpers::second_segment_midpoint(), 0.8, 0.9, 0.0),
                Timestamp(0.0),
            )
            .unwrap();
        fusion.recalculate(&graph, &spatial, Timestamp(1.0)).unwrap();

        let near = graph.get_edge(EdgeKey::new(n1, n2, 0)).unwrap().risk_score;
        let far = graph.get_edge(EdgeKey::new(n0, n1, 0)).unwrap().risk_score;
        assert!(near >= 0.3, "affected segment risk {near}");
        assert_eq!(far, 0.0, "distant segment must stay clean");
    }

    #[test]
    fn many_observations_one_batch() {
        let (graph, spatial, _) = helpers::graph_and_index();
        let counter = Arc::new(BatchCounter(AtomicUsize::new(0)));
        graph.subscribe(counter.clone());

        let mut fusion = fusion();
        for i in 0..15 {
            let location = GeoPoint::new(14.65, 121.10 + i as f32 * 0.0001);
            fusion
                .ingest(helpers::station(&format!("s{i}"), location, 0.4, 0.0), Timestamp(0.0))
                .unwrap();
        }
        let summary = fusion.recalculate(&graph, &spatial, Timestamp(1.0)).unwrap();

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(summary.stations_used, 15);
        assert!(summary.edges_updated > 0);
    }

    #[test]
    fn station_interpolation_respects_radius() {
        let (graph, spatial, [n0, n1, n2]) = helpers::graph_and_index();
        let mut fusion = fusion();

        // Station sits on the first segment's midpoint; the second segment's
        // midpoint is ~1.08 km away, outside the 800 m radius.
        fusion
            .ingest(
                helpers::station("marikina", GeoPoint::new(14.65, 121.105), 0.5, 0.0),
                Timestamp(0.0),
            )
            .unwrap();
        fusion.recalculate(&graph, &spatial, Timestamp(1.0)).unwrap();

        let near = graph.get_edge(EdgeKey::new(n0, n1, 0)).unwrap().risk_score;
        let far = graph.get_edge(EdgeKey::new(n1, n2, 0)).unwrap().risk_score;
        assert!(near > 0.3, "gauged segment risk {near}");
        assert_eq!(far, 0.0);
    }

    #[test]
    fn decayed_report_lowers_risk_and_expiry_drains_it() {
        let (graph, spatial, [_, n1, n2]) = helpers::graph_and_index();
        let key = EdgeKey::new(n1, n2, 0);
        let mut fusion = fusion();

        fusion
            .ingest(
                helpers::scout_report(helpers::second_segment_midpoint(), 1.0, 0.9, 0.0),
                Timestamp(0.0),
            )
            .unwrap();
        fusion.recalculate(&graph, &spatial, Timestamp(1.0)).unwrap();
        let fresh_risk = graph.get_edge(key).unwrap().risk_score;
        assert!(fresh_risk > 0.3);

        // One half-life later the signal is weaker but alive.
        fusion.recalculate(&graph, &spatial, Timestamp(1_800.0)).unwrap();
        let decayed = graph.get_edge(key).unwrap().risk_score;
        assert!(decayed < fresh_risk, "decayed {decayed} < fresh {fresh_risk}");
        assert!(decayed > 0.0);

        // Two half-lives = the default TTL: the report expires and the edge
        // drains to zero even though no fresh observation arrived.
        fusion.recalculate(&graph, &spatial, Timestamp(3_600.0)).unwrap();
        assert_eq!(graph.get_edge(key).unwrap().risk_score, 0.0);
    }

    #[test]
    fn invalid_observation_dropped_with_counter() {
        let (graph, spatial, _) = helpers::graph_and_index();
        let mut fusion = fusion();

        let bad = helpers::scout_report(helpers::second_segment_midpoint(), 1.7, 0.9, 0.0);
        assert!(fusion.ingest(bad, Timestamp(0.0)).is_err());
        assert_eq!(fusion.dropped_observations(), 1);

        fusion.recalculate(&graph, &spatial, Timestamp(1.0)).unwrap();
        assert_eq!(graph.risk_statistics().nonzero, 0);
    }

    #[test]
    fn non_flood_chatter_ignored() {
        let (graph, spatial, _) = helpers::graph_and_index();
        let mut fusion = fusion();

        let mut report = helpers::scout_report(helpers::second_segment_midpoint(), 0.9, 0.9, 0.0);
        if let masfro_core::HazardObservation::Scout(r) = &mut report {
            r.classification.is_flood_related = false;
        }
        fusion.ingest(report, Timestamp(0.0)).unwrap();
        fusion.recalculate(&graph, &spatial, Timestamp(1.0)).unwrap();
        assert_eq!(graph.risk_statistics().nonzero, 0);
    }
}

// ── Raster integration ────────────────────────────────────────────────────────

#[cfg(test)]
mod raster {
    use std::sync::Arc;

    use masfro_core::{
        BoundingBox, CacheConfig, GeoPoint, ReturnPeriod, RiskConfig, Timestamp,
    };

    use super::helpers;
    use crate::{HazardFusion, RasterError, RasterProvider};

    struct FlatRaster {
        depth: f32,
        bbox: BoundingBox,
    }

    impl RasterProvider for FlatRaster {
        fn depth_at(
            &self,
            _period: ReturnPeriod,
            _step: u8,
            point: GeoPoint,
        ) -> Result<Option<f32>, RasterError> {
            Ok(self.bbox.contains(point).then_some(self.depth))
        }

        fn footprint(&self) -> Option<BoundingBox> {
            Some(self.bbox)
        }
    }

    struct BrokenRaster;

    impl RasterProvider for BrokenRaster {
        fn depth_at(
            &self,
            _period: ReturnPeriod,
            _step: u8,
            _point: GeoPoint,
        ) -> Result<Option<f32>, RasterError> {
            Err(RasterError::Read("checksum mismatch".into()))
        }
    }

    #[test]
    fn raster_scenario_floods_covered_edges() {
        let (graph, spatial, _) = helpers::graph_and_index();
        let bbox = BoundingBox::new(14.58, 14.78, 121.05, 121.18);
        let mut fusion = HazardFusion::new(RiskConfig::default(), &CacheConfig::default())
            .with_raster(Arc::new(FlatRaster { depth: 0.4, bbox }));
        fusion.set_scenario(ReturnPeriod::Rr02, 3);

        let summary = fusion.recalculate(&graph, &spatial, Timestamp(0.0)).unwrap();
        assert_eq!(summary.edges_updated, graph.edge_count());
        let stats = graph.risk_statistics();
        assert_eq!(stats.nonzero, graph.edge_count());
        assert!(stats.max > 0.25);
    }

    #[test]
    fn no_scenario_means_raster_unused() {
        let (graph, spatial, _) = helpers::graph_and_index();
        let bbox = BoundingBox::new(14.58, 14.78, 121.05, 121.18);
        let mut fusion = HazardFusion::new(RiskConfig::default(), &CacheConfig::default())
            .with_raster(Arc::new(FlatRaster { depth: 0.4, bbox }));

        fusion.recalculate(&graph, &spatial, Timestamp(0.0)).unwrap();
        assert_eq!(graph.risk_statistics().nonzero, 0);
    }

    #[test]
    fn raster_failure_degrades_to_stations() {
        let (graph, spatial, [n0, n1, _]) = helpers::graph_and_index();
        let mut fusion = HazardFusion::new(RiskConfig::default(), &CacheConfig::default())
            .with_raster(Arc::new(BrokenRaster));
        fusion.set_scenario(ReturnPeriod::Rr01, 1);

        fusion
            .ingest(
                helpers::station("backup", GeoPoint::new(14.65, 121.105), 0.5, 0.0),
                Timestamp(0.0),
            )
            .unwrap();
        fusion.recalculate(&graph, &spatial, Timestamp(1.0)).unwrap();

        assert!(fusion.raster_errors() > 0);
        let near = graph
            .get_edge(masfro_core::EdgeKey::new(n0, n1, 0))
            .unwrap()
            .risk_score;
        assert!(near > 0.0, "station fallback must still raise risk");
    }
}
