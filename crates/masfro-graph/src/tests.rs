//! Unit tests for masfro-graph.
//!
//! All tests use hand-crafted miniature graphs; no graph files are read
//! except through in-memory cursors.

#[cfg(test)]
mod helpers {
    use masfro_core::{BoundingBox, GeoPoint, HighwayClass, NodeId};

    use crate::{GraphBuilder, GraphStore};

    pub fn bbox() -> BoundingBox {
        BoundingBox::new(14.58, 14.78, 121.05, 121.18)
    }

    /// Line graph 0 → 1 → 2 (100 m residential segments, one way).
    pub fn line_graph() -> (GraphStore, [NodeId; 3]) {
        let mut b = GraphBuilder::new(bbox());
        let n0 = b.add_node(100, GeoPoint::new(14.650, 121.100), 1).unwrap();
        let n1 = b.add_node(101, GeoPoint::new(14.650, 121.101), 2).unwrap();
        let n2 = b.add_node(102, GeoPoint::new(14.650, 121.102), 1).unwrap();
        b.add_edge(n0, n1, 100.0, HighwayClass::Residential).unwrap();
        b.add_edge(n1, n2, 100.0, HighwayClass::Residential).unwrap();
        (b.build(2_000.0), [n0, n1, n2])
    }

    /// Two nodes with two parallel edges 0 → 1 (keys 0 and 1).
    pub fn parallel_graph() -> (GraphStore, [NodeId; 2]) {
        let mut b = GraphBuilder::new(bbox());
        let n0 = b.add_node(200, GeoPoint::new(14.660, 121.110), 2).unwrap();
        let n1 = b.add_node(201, GeoPoint::new(14.660, 121.111), 2).unwrap();
        b.add_edge(n0, n1, 100.0, HighwayClass::Primary).unwrap();
        b.add_edge(n0, n1, 100.0, HighwayClass::Residential).unwrap();
        (b.build(2_000.0), [n0, n1])
    }
}

// ── Builder & CSR structure ───────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use masfro_core::{EdgeKey, GeoPoint, HighwayClass, NodeId};

    use crate::{GraphBuilder, GraphError};

    #[test]
    fn empty_build() {
        let store = GraphBuilder::new(super::helpers::bbox()).build(0.0);
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.edge_count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_external_id_rejected() {
        let mut b = GraphBuilder::new(super::helpers::bbox());
        b.add_node(7, GeoPoint::new(14.65, 121.10), 1).unwrap();
        let err = b.add_node(7, GeoPoint::new(14.66, 121.11), 1);
        assert!(matches!(err, Err(GraphError::DuplicateNode(7))));
    }

    #[test]
    fn non_positive_length_rejected() {
        let mut b = GraphBuilder::new(super::helpers::bbox());
        let a = b.add_node(1, GeoPoint::new(14.65, 121.10), 1).unwrap();
        let c = b.add_node(2, GeoPoint::new(14.66, 121.11), 1).unwrap();
        assert!(b.add_edge(a, c, 0.0, HighwayClass::Primary).is_err());
        assert!(b.add_edge(a, c, -5.0, HighwayClass::Primary).is_err());
    }

    #[test]
    fn parallel_keys_assigned_in_insertion_order() {
        let (store, [n0, n1]) = super::helpers::parallel_graph();

        let k0 = store.get_edge(EdgeKey::new(n0, n1, 0)).unwrap();
        let k1 = store.get_edge(EdgeKey::new(n0, n1, 1)).unwrap();
        assert_eq!(k0.class, HighwayClass::Primary);
        assert_eq!(k1.class, HighwayClass::Residential);
        assert!(store.get_edge(EdgeKey::new(n0, n1, 2)).is_err());
    }

    #[test]
    fn csr_out_edges_contiguous() {
        let (store, [n0, n1, n2]) = super::helpers::line_graph();
        assert_eq!(store.out_edges(n0).count(), 1);
        assert_eq!(store.out_edges(n1).count(), 1);
        assert_eq!(store.out_edges(n2).count(), 0);
        for e in store.out_edges(n0) {
            assert_eq!(store.edge_endpoints(e).0, n0);
        }
    }

    #[test]
    fn base_speed_imputed_from_class() {
        let (store, [n0, n1]) = super::helpers::parallel_graph();
        let primary = store.get_edge(EdgeKey::new(n0, n1, 0)).unwrap();
        assert_eq!(primary.base_speed_kmh, 50.0);
    }

    #[test]
    fn unknown_node_lookup_fails() {
        let (store, _) = super::helpers::line_graph();
        assert!(store.get_node(NodeId(99)).is_err());
        assert!(store.neighbors_out(NodeId(99)).is_err());
    }
}

// ── Risk updates ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod risk {
    use masfro_core::{EdgeKey, NodeId, Timestamp};
    use rustc_hash::FxHashMap;

    #[test]
    fn update_clamps_and_recomputes_weight() {
        let (store, [n0, n1, _]) = super::helpers::line_graph();
        let key = EdgeKey::new(n0, n1, 0);

        store.update_edge_risk(key, 1.7, Timestamp(10.0)).unwrap();
        let edge = store.get_edge(key).unwrap();
        assert_eq!(edge.risk_score, 1.0);
        assert_eq!(edge.weight, 100.0 * (1.0 + 1.0 * 2_000.0));
        assert_eq!(edge.last_updated, Timestamp(10.0));

        store.update_edge_risk(key, -0.3, Timestamp(11.0)).unwrap();
        assert_eq!(store.get_edge(key).unwrap().risk_score, 0.0);
    }

    #[test]
    fn weight_matches_formula_at_read_time() {
        let (store, [n0, n1, n2]) = super::helpers::line_graph();
        store.update_edge_risk(EdgeKey::new(n0, n1, 0), 0.4, Timestamp(1.0)).unwrap();
        store.update_edge_risk(EdgeKey::new(n1, n2, 0), 0.9, Timestamp(1.0)).unwrap();

        for edge in store.snapshot_edges(|_| true) {
            let expected = edge.length_m * (1.0 + edge.risk_score * 2_000.0);
            assert!((edge.weight - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn unknown_edge_is_recoverable() {
        let (store, [n0, _, _]) = super::helpers::line_graph();
        let bogus = EdgeKey::new(n0, NodeId(77), 0);
        assert!(store.update_edge_risk(bogus, 0.5, Timestamp(0.0)).is_err());
        // State untouched.
        assert_eq!(store.risk_statistics().nonzero, 0);
    }

    #[test]
    fn batch_equivalent_to_sequence() {
        let (batch_store, [a0, a1, a2]) = super::helpers::line_graph();
        let (seq_store, _) = super::helpers::line_graph();

        let mut updates = FxHashMap::default();
        updates.insert(EdgeKey::new(a0, a1, 0), 0.3);
        updates.insert(EdgeKey::new(a1, a2, 0), 0.8);
        let outcome = batch_store.batch_update_risks(&updates, Timestamp(5.0)).unwrap();
        assert_eq!(outcome.applied, 2);
        assert!(outcome.unknown.is_empty());

        for (key, risk) in &updates {
            seq_store.update_edge_risk(*key, *risk, Timestamp(5.0)).unwrap();
        }

        for (key, _) in &updates {
            assert_eq!(
                batch_store.get_edge(*key).unwrap().risk_score,
                seq_store.get_edge(*key).unwrap().risk_score,
            );
        }
    }

    #[test]
    fn batch_reports_unknown_keys_but_applies_rest() {
        let (store, [n0, n1, _]) = super::helpers::line_graph();
        let mut updates = FxHashMap::default();
        updates.insert(EdgeKey::new(n0, n1, 0), 0.6);
        updates.insert(EdgeKey::new(n0, NodeId(42), 0), 0.6);

        let outcome = store.batch_update_risks(&updates, Timestamp(1.0)).unwrap();
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.unknown.len(), 1);
        assert_eq!(store.get_edge(EdgeKey::new(n0, n1, 0)).unwrap().risk_score, 0.6);
    }

    #[test]
    fn reset_risks_zeroes_everything() {
        let (store, [n0, n1, n2]) = super::helpers::line_graph();
        store.update_edge_risk(EdgeKey::new(n0, n1, 0), 0.5, Timestamp(1.0)).unwrap();
        store.update_edge_risk(EdgeKey::new(n1, n2, 0), 0.9, Timestamp(1.0)).unwrap();
        assert_eq!(store.risk_statistics().nonzero, 2);

        store.reset_risks(Timestamp(2.0));
        let stats = store.risk_statistics();
        assert_eq!(stats.nonzero, 0);
        assert_eq!(stats.max, 0.0);
        assert_eq!(store.node_count(), 3);
    }
}

// ── Listeners ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod listeners {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use masfro_core::{EdgeId, EdgeKey, Timestamp};
    use rustc_hash::FxHashMap;

    use crate::GraphListener;

    struct CountingListener {
        batches: AtomicUsize,
        edges: AtomicUsize,
    }

    impl GraphListener for CountingListener {
        fn on_risk_batch(&self, _generation: u64, changed: &[EdgeId]) {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.edges.fetch_add(changed.len(), Ordering::SeqCst);
        }
    }

    #[test]
    fn one_notification_per_batch() {
        let (store, [n0, n1, n2]) = super::helpers::line_graph();
        let listener = Arc::new(CountingListener {
            batches: AtomicUsize::new(0),
            edges: AtomicUsize::new(0),
        });
        store.subscribe(listener.clone());

        let mut updates = FxHashMap::default();
        updates.insert(EdgeKey::new(n0, n1, 0), 0.2);
        updates.insert(EdgeKey::new(n1, n2, 0), 0.7);
        store.batch_update_risks(&updates, Timestamp(0.0)).unwrap();

        assert_eq!(listener.batches.load(Ordering::SeqCst), 1);
        assert_eq!(listener.edges.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn generation_advances_per_batch() {
        let (store, [n0, n1, _]) = super::helpers::line_graph();
        let g0 = store.risk_generation();
        store.update_edge_risk(EdgeKey::new(n0, n1, 0), 0.1, Timestamp(0.0)).unwrap();
        store.update_edge_risk(EdgeKey::new(n0, n1, 0), 0.2, Timestamp(1.0)).unwrap();
        assert_eq!(store.risk_generation(), g0 + 2);
    }
}

// ── CSV load ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod load {
    use std::io::Cursor;

    use masfro_core::GraphConfig;

    use crate::load_from_readers;

    const NODES: &str = "\
node_id,lat,lon,street_count
100,14.6507,121.1029,3
101,14.6391,121.0957,2
";

    const EDGES: &str = "\
u,v,length_m,highway
100,101,420.5,primary
101,100,420.5,primary
100,101,460.0,residential
";

    #[test]
    fn loads_nodes_edges_and_parallel_keys() {
        let store = load_from_readers(
            Cursor::new(NODES),
            Cursor::new(EDGES),
            &GraphConfig::default(),
        )
        .unwrap();

        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 3);

        let n0 = store.node_by_external(100).unwrap();
        let n1 = store.node_by_external(101).unwrap();
        let neighbors = store.neighbors_out(n0).unwrap();
        assert_eq!(neighbors.len(), 2); // two parallel edges to n1
        assert!(neighbors.iter().all(|(v, _, _)| *v == n1));
        assert_eq!(neighbors[0].1, 0);
        assert_eq!(neighbors[1].1, 1);
    }

    #[test]
    fn edge_referencing_missing_node_fails() {
        let bad_edges = "u,v,length_m,highway\n100,999,50.0,primary\n";
        let result = load_from_readers(
            Cursor::new(NODES),
            Cursor::new(bad_edges),
            &GraphConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_highway_class_falls_back() {
        let edges = "u,v,length_m,highway\n100,101,50.0,bridleway\n";
        let store = load_from_readers(
            Cursor::new(NODES),
            Cursor::new(edges),
            &GraphConfig::default(),
        )
        .unwrap();
        let snap = store.snapshot_edges(|_| true);
        assert_eq!(snap[0].base_speed_kmh, 20.0); // unclassified
    }
}
