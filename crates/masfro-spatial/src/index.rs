//! The `SpatialIndex`: node k-NN, edge radius queries, waterway proximity.

use rstar::primitives::Line;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::info;

use masfro_core::{EdgeId, GeoPoint, NodeId};
use masfro_graph::GraphStore;

use crate::waterway::{proximity_risk, Waterway};

// ── Local projection ──────────────────────────────────────────────────────────

/// Equirectangular projection to local metres around a reference point.
///
/// Within a city-scale bounding box the distortion is far below the graph's
/// own coordinate precision, and it makes R-tree distances metric.
#[derive(Clone, Copy, Debug)]
struct Projection {
    origin: GeoPoint,
    m_per_deg_lat: f32,
    m_per_deg_lon: f32,
}

impl Projection {
    fn around(origin: GeoPoint) -> Self {
        Self {
            origin,
            m_per_deg_lat: 110_574.0,
            m_per_deg_lon: 111_320.0 * origin.lat.to_radians().cos(),
        }
    }

    #[inline]
    fn project(&self, p: GeoPoint) -> [f32; 2] {
        [
            (p.lon - self.origin.lon) * self.m_per_deg_lon,
            (p.lat - self.origin.lat) * self.m_per_deg_lat,
        ]
    }

    #[inline]
    fn unproject(&self, xy: [f32; 2]) -> GeoPoint {
        GeoPoint::new(
            self.origin.lat + xy[1] / self.m_per_deg_lat,
            self.origin.lon + xy[0] / self.m_per_deg_lon,
        )
    }
}

// ── R-tree entries ────────────────────────────────────────────────────────────

#[derive(Clone)]
struct NodeEntry {
    point: [f32; 2],
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

#[derive(Clone)]
struct EdgeEntry {
    /// Projected edge midpoint.
    point: [f32; 2],
    id: EdgeId,
}

impl RTreeObject for EdgeEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for EdgeEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// One projected waterway segment with its kind's weight pre-resolved.
#[derive(Clone)]
struct SegmentEntry {
    line: Line<[f32; 2]>,
    kind: crate::WaterwayKind,
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.line.envelope()
    }
}

impl PointDistance for SegmentEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        self.line.distance_2(point)
    }
}

// ── SpatialIndex ──────────────────────────────────────────────────────────────

/// How many tree candidates to refine with exact haversine for k-NN queries.
/// Projection error is sub-metre at city scale, so a small surplus suffices.
const KNN_REFINE: usize = 8;

/// Geographic indexes over a loaded road graph.
///
/// Built once at load time; rebuild if the node set changes.
pub struct SpatialIndex {
    projection: Projection,
    node_tree: RTree<NodeEntry>,
    edge_tree: RTree<EdgeEntry>,
    /// Precomputed waterway-proximity prior per node, indexed by `NodeId`.
    river_risk: Vec<f32>,
}

impl SpatialIndex {
    /// Build all three indexes from the graph topology and waterway set.
    ///
    /// Time complexity: O((N + E + W·N) log) dominated by the per-node
    /// nearest-segment queries for the waterway prior.
    pub fn build(store: &GraphStore, waterways: &[Waterway]) -> Self {
        let origin = if store.is_empty() {
            GeoPoint::new(0.0, 0.0)
        } else {
            let n = store.node_count() as f32;
            let (lat, lon) = (0..store.node_count() as u32)
                .map(NodeId)
                .map(|id| store.node_position(id))
                .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
            GeoPoint::new(lat / n, lon / n)
        };
        let projection = Projection::around(origin);

        // Node tree (bulk load — much faster than N inserts).
        let node_entries: Vec<NodeEntry> = (0..store.node_count() as u32)
            .map(NodeId)
            .map(|id| NodeEntry { point: projection.project(store.node_position(id)), id })
            .collect();
        let node_tree = RTree::bulk_load(node_entries);

        // Edge-midpoint tree.
        let edge_entries: Vec<EdgeEntry> = (0..store.edge_count() as u32)
            .map(EdgeId)
            .map(|id| EdgeEntry { point: projection.project(store.edge_midpoint(id)), id })
            .collect();
        let edge_tree = RTree::bulk_load(edge_entries);

        // Waterway segment tree, then the per-node proximity prior.
        let mut segments = Vec::new();
        for waterway in waterways {
            for pair in waterway.points.windows(2) {
                segments.push(SegmentEntry {
                    line: Line::new(projection.project(pair[0]), projection.project(pair[1])),
                    kind: waterway.kind,
                });
            }
        }
        let segment_tree = RTree::bulk_load(segments);

        let river_risk: Vec<f32> = (0..store.node_count() as u32)
            .map(NodeId)
            .map(|id| {
                let p = projection.project(store.node_position(id));
                match segment_tree.nearest_neighbor(&p) {
                    None => 0.0,
                    Some(seg) => proximity_risk(seg.kind, seg.distance_2(&p).sqrt()),
                }
            })
            .collect();

        info!(
            nodes = store.node_count(),
            edges = store.edge_count(),
            waterway_segments = segment_tree.size(),
            "spatial index built"
        );

        Self { projection, node_tree, edge_tree, river_risk }
    }

    // ── Node queries ──────────────────────────────────────────────────────

    /// The exact nearest node to `p` and its haversine distance in metres.
    ///
    /// Returns `None` only for an empty graph.
    pub fn nearest_node(&self, p: GeoPoint) -> Option<(NodeId, f32)> {
        self.nearest_nodes(p, 1).into_iter().next()
    }

    /// Up to `k` nearest nodes, sorted by ascending haversine distance.
    pub fn nearest_nodes(&self, p: GeoPoint, k: usize) -> Vec<(NodeId, f32)> {
        let query = self.projection.project(p);

        // Refine with exact haversine: the projection ranking can disagree
        // with the great-circle ranking only within this candidate set.
        let mut candidates: Vec<(NodeId, f32)> = self
            .node_tree
            .nearest_neighbor_iter(&query)
            .take(k.max(1) + KNN_REFINE)
            .map(|e| (e.id, p.distance_m(self.projection.unproject(e.point))))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        candidates.truncate(k);
        candidates
    }

    // ── Edge queries ──────────────────────────────────────────────────────

    /// All edges whose midpoint lies within `radius_m` of `p`.
    pub fn edges_within(&self, p: GeoPoint, radius_m: f32) -> Vec<EdgeId> {
        let query = self.projection.project(p);
        self.edge_tree
            .locate_within_distance(query, radius_m * radius_m)
            .map(|e| e.id)
            .collect()
    }

    // ── Waterway prior ────────────────────────────────────────────────────

    /// Precomputed river-proximity risk for `node` (0 when no waterways were
    /// supplied or the node is unknown).
    #[inline]
    pub fn river_risk(&self, node: NodeId) -> f32 {
        self.river_risk.get(node.index()).copied().unwrap_or(0.0)
    }

    pub fn node_count(&self) -> usize {
        self.river_risk.len()
    }
}
