//! Incremental graph construction.

use rustc_hash::FxHashMap;
use tracing::warn;

use masfro_core::{BoundingBox, GeoPoint, HighwayClass, NodeId};

use crate::error::{GraphError, GraphResult};
use crate::store::GraphStore;

struct RawNode {
    external_id: u64,
    pos: GeoPoint,
    street_count: u16,
}

struct RawEdge {
    u: NodeId,
    v: NodeId,
    length_m: f32,
    class: HighwayClass,
}

/// Construct a [`GraphStore`] incrementally, then call [`build`](Self::build).
///
/// Nodes and directed edges may arrive in any order.  `build()` sorts edges
/// by `(u, v)`, assigns parallel keys in insertion order, and constructs the
/// CSR arrays.
///
/// # Example
///
/// ```
/// use masfro_core::{BoundingBox, GeoPoint, HighwayClass};
/// use masfro_graph::GraphBuilder;
///
/// let bbox = BoundingBox::new(14.58, 14.78, 121.05, 121.18);
/// let mut b = GraphBuilder::new(bbox);
/// let a = b.add_node(10, GeoPoint::new(14.65, 121.10), 3).unwrap();
/// let c = b.add_node(11, GeoPoint::new(14.66, 121.11), 2).unwrap();
/// b.add_edge(a, c, 1_200.0, HighwayClass::Primary).unwrap();
/// let store = b.build(2_000.0);
/// assert_eq!(store.node_count(), 2);
/// assert_eq!(store.edge_count(), 1);
/// ```
pub struct GraphBuilder {
    bbox: BoundingBox,
    nodes: Vec<RawNode>,
    external_to_node: FxHashMap<u64, NodeId>,
    raw_edges: Vec<RawEdge>,
    out_of_bbox: usize,
}

impl GraphBuilder {
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            nodes: Vec::new(),
            external_to_node: FxHashMap::default(),
            raw_edges: Vec::new(),
            out_of_bbox: 0,
        }
    }

    /// Pre-allocate for the expected graph size to reduce reallocations when
    /// bulk-loading.
    pub fn with_capacity(bbox: BoundingBox, nodes: usize, edges: usize) -> Self {
        let mut builder = Self::new(bbox);
        builder.nodes.reserve(nodes);
        builder.raw_edges.reserve(edges);
        builder
    }

    /// Add a node and return its dense `NodeId`.
    ///
    /// Coordinates outside the declared bounding box are accepted with a
    /// warning (counted, logged once at build time).
    pub fn add_node(
        &mut self,
        external_id: u64,
        pos: GeoPoint,
        street_count: u16,
    ) -> GraphResult<NodeId> {
        if self.external_to_node.contains_key(&external_id) {
            return Err(GraphError::DuplicateNode(external_id));
        }
        if !self.bbox.contains(pos) {
            self.out_of_bbox += 1;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(RawNode { external_id, pos, street_count });
        self.external_to_node.insert(external_id, id);
        Ok(id)
    }

    /// Add a **directed** segment from `u` to `v`.  The parallel key is
    /// assigned at build time from insertion order among `(u, v)` duplicates.
    pub fn add_edge(
        &mut self,
        u: NodeId,
        v: NodeId,
        length_m: f32,
        class: HighwayClass,
    ) -> GraphResult<()> {
        if u.index() >= self.nodes.len() {
            return Err(GraphError::UnknownNode(u));
        }
        if v.index() >= self.nodes.len() {
            return Err(GraphError::UnknownNode(v));
        }
        if length_m <= 0.0 || !length_m.is_finite() {
            return Err(GraphError::BadEdgeLength { u, v, length_m });
        }
        self.raw_edges.push(RawEdge { u, v, length_m, class });
        Ok(())
    }

    /// Dense id of a previously added node, by its external id.
    pub fn node_by_external(&self, external_id: u64) -> Option<NodeId> {
        self.external_to_node.get(&external_id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.raw_edges.len()
    }

    /// Consume the builder and produce a [`GraphStore`].
    ///
    /// `weight_penalty` is the factor baked into the stored per-edge weight
    /// column: `weight = length × (1 + risk × weight_penalty)`.
    ///
    /// Time complexity: O(E log E) for the edge sort.
    pub fn build(self, weight_penalty: f32) -> GraphStore {
        if self.out_of_bbox > 0 {
            warn!(
                nodes = self.out_of_bbox,
                "accepted nodes outside the declared bounding box"
            );
        }

        let node_count = self.nodes.len();

        // Stable sort by (u, v): parallel edges stay in insertion order, which
        // becomes their parallel key.
        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| (e.u.0, e.v.0));

        let edge_count = raw.len();
        let mut edge_from = Vec::with_capacity(edge_count);
        let mut edge_to = Vec::with_capacity(edge_count);
        let mut edge_key = Vec::with_capacity(edge_count);
        let mut edge_length_m = Vec::with_capacity(edge_count);
        let mut edge_class = Vec::with_capacity(edge_count);
        let mut edge_base_speed = Vec::with_capacity(edge_count);

        let mut prev: Option<(NodeId, NodeId)> = None;
        let mut k: u8 = 0;
        for e in &raw {
            k = match prev {
                Some((u, v)) if u == e.u && v == e.v => k.saturating_add(1),
                _ => 0,
            };
            prev = Some((e.u, e.v));

            edge_from.push(e.u);
            edge_to.push(e.v);
            edge_key.push(k);
            edge_length_m.push(e.length_m);
            edge_class.push(e.class);
            edge_base_speed.push(e.class.base_speed_kmh());
        }

        // CSR row pointer.
        let mut out_start = vec![0u32; node_count + 1];
        for e in &raw {
            out_start[e.u.index() + 1] += 1;
        }
        for i in 1..=node_count {
            out_start[i] += out_start[i - 1];
        }
        debug_assert_eq!(out_start[node_count] as usize, edge_count);

        GraphStore::from_parts(
            self.nodes.iter().map(|n| n.external_id).collect(),
            self.nodes.iter().map(|n| n.pos).collect(),
            self.nodes.iter().map(|n| n.street_count).collect(),
            self.external_to_node,
            out_start,
            edge_from,
            edge_to,
            edge_key,
            edge_length_m,
            edge_class,
            edge_base_speed,
            weight_penalty,
        )
    }
}
