//! The `GraphStore` and its read/write discipline.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;
use tracing::debug;

use masfro_core::{BoundingBox, EdgeId, EdgeKey, GeoPoint, HighwayClass, NodeId, Timestamp};

use crate::builder::GraphBuilder;
use crate::error::{GraphError, GraphResult};

// ── Snapshots ─────────────────────────────────────────────────────────────────

/// Copy of one node's attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub external_id: u64,
    pub position: GeoPoint,
    pub street_count: u16,
}

/// Copy of one edge's attributes at a point in time.
///
/// `risk_score` and `weight` are read under the same guard, so they are
/// always mutually consistent: `weight = length × (1 + risk × penalty)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeSnapshot {
    pub id: EdgeId,
    pub key: EdgeKey,
    pub length_m: f32,
    pub class: HighwayClass,
    pub base_speed_kmh: f32,
    pub risk_score: f32,
    pub weight: f32,
    pub last_updated: Timestamp,
}

/// Aggregate risk numbers across all edges.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RiskStatistics {
    pub edges: usize,
    pub nonzero: usize,
    pub mean: f32,
    pub max: f32,
}

/// Outcome of a batch risk update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchOutcome {
    pub applied: usize,
    /// Keys that matched no edge; the rest of the batch still applied.
    pub unknown: Vec<EdgeKey>,
}

// ── Listener ──────────────────────────────────────────────────────────────────

/// Callback invoked after each committed risk batch with the set of changed
/// edges.  Used by the spatial index refresher and the websocket notifier.
///
/// Called outside the store's write lock; implementations may read the store
/// freely but must not block for long.
pub trait GraphListener: Send + Sync {
    fn on_risk_batch(&self, generation: u64, changed: &[EdgeId]);
}

// ── Mutable per-edge state ────────────────────────────────────────────────────

struct RiskState {
    risk: Vec<f32>,
    weight: Vec<f32>,
    last_updated: Vec<Timestamp>,
    /// Incremented once per committed batch.
    generation: u64,
}

// ── GraphStore ────────────────────────────────────────────────────────────────

/// Directed road multigraph in CSR format with lock-guarded per-edge risk.
///
/// Construct via [`GraphBuilder`](crate::GraphBuilder) or
/// [`load_from_csv`](crate::load_from_csv).
pub struct GraphStore {
    // ── Immutable topology ────────────────────────────────────────────────
    node_external: Vec<u64>,
    node_pos: Vec<GeoPoint>,
    node_street_count: Vec<u16>,
    external_to_node: FxHashMap<u64, NodeId>,
    out_start: Vec<u32>,
    edge_from: Vec<NodeId>,
    edge_to: Vec<NodeId>,
    edge_key: Vec<u8>,
    edge_length_m: Vec<f32>,
    edge_class: Vec<HighwayClass>,
    edge_base_speed: Vec<f32>,
    weight_penalty: f32,

    // ── Mutable risk state ────────────────────────────────────────────────
    state: RwLock<RiskState>,
    listeners: Mutex<Vec<Arc<dyn GraphListener>>>,
}

impl GraphStore {
    /// An empty store: every routing query against it is `Unavailable`.
    pub fn empty() -> Self {
        GraphBuilder::new(BoundingBox::new(0.0, 0.0, 0.0, 0.0)).build(0.0)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        node_external: Vec<u64>,
        node_pos: Vec<GeoPoint>,
        node_street_count: Vec<u16>,
        external_to_node: FxHashMap<u64, NodeId>,
        out_start: Vec<u32>,
        edge_from: Vec<NodeId>,
        edge_to: Vec<NodeId>,
        edge_key: Vec<u8>,
        edge_length_m: Vec<f32>,
        edge_class: Vec<HighwayClass>,
        edge_base_speed: Vec<f32>,
        weight_penalty: f32,
    ) -> Self {
        let edge_count = edge_to.len();
        let state = RiskState {
            risk: vec![0.0; edge_count],
            weight: edge_length_m.clone(),
            last_updated: vec![Timestamp::default(); edge_count],
            generation: 0,
        };
        Self {
            node_external,
            node_pos,
            node_street_count,
            external_to_node,
            out_start,
            edge_from,
            edge_to,
            edge_key,
            edge_length_m,
            edge_class,
            edge_base_speed,
            weight_penalty,
            state: RwLock::new(state),
            listeners: Mutex::new(Vec::new()),
        }
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    // ── Topology reads (no lock) ──────────────────────────────────────────

    pub fn get_node(&self, id: NodeId) -> GraphResult<NodeSnapshot> {
        if id.index() >= self.node_count() {
            return Err(GraphError::UnknownNode(id));
        }
        Ok(NodeSnapshot {
            id,
            external_id: self.node_external[id.index()],
            position: self.node_pos[id.index()],
            street_count: self.node_street_count[id.index()],
        })
    }

    pub fn node_by_external(&self, external_id: u64) -> Option<NodeId> {
        self.external_to_node.get(&external_id).copied()
    }

    /// Position of a known-valid node.  Panics on an out-of-range id; use
    /// [`get_node`](Self::get_node) for untrusted input.
    #[inline]
    pub fn node_position(&self, id: NodeId) -> GeoPoint {
        self.node_pos[id.index()]
    }

    /// `EdgeId`s of all outgoing edges from `node` — a contiguous CSR range.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.out_start[node.index()] as usize;
        let end = self.out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    #[inline]
    pub fn edge_endpoints(&self, edge: EdgeId) -> (NodeId, NodeId) {
        (self.edge_from[edge.index()], self.edge_to[edge.index()])
    }

    #[inline]
    pub fn edge_key_of(&self, edge: EdgeId) -> EdgeKey {
        EdgeKey::new(
            self.edge_from[edge.index()],
            self.edge_to[edge.index()],
            self.edge_key[edge.index()],
        )
    }

    #[inline]
    pub fn edge_midpoint(&self, edge: EdgeId) -> GeoPoint {
        let (u, v) = self.edge_endpoints(edge);
        self.node_pos[u.index()].midpoint(self.node_pos[v.index()])
    }

    #[inline]
    pub fn edge_class(&self, edge: EdgeId) -> HighwayClass {
        self.edge_class[edge.index()]
    }

    #[inline]
    pub fn edge_length(&self, edge: EdgeId) -> f32 {
        self.edge_length_m[edge.index()]
    }

    /// Resolve an `(u, v, k)` key to its dense edge id by scanning `u`'s CSR
    /// range (O(out-degree)).
    pub fn edge_id(&self, key: EdgeKey) -> Option<EdgeId> {
        if key.u.index() >= self.node_count() {
            return None;
        }
        self.out_edges(key.u).find(|&e| {
            self.edge_to[e.index()] == key.v && self.edge_key[e.index()] == key.k
        })
    }

    // ── Locked reads ──────────────────────────────────────────────────────

    /// Consistent read view over risk state plus the immutable topology.
    ///
    /// Holding the snapshot blocks writers; routing copies what it needs and
    /// drops it promptly.
    pub fn snapshot(&self) -> GraphSnapshot<'_> {
        GraphSnapshot { store: self, state: self.state.read() }
    }

    pub fn get_edge(&self, key: EdgeKey) -> GraphResult<EdgeSnapshot> {
        let edge = self.edge_id(key).ok_or(GraphError::UnknownEdge(key))?;
        Ok(self.snapshot().edge(edge))
    }

    /// All outgoing `(neighbor, parallel key, edge)` triples of `u`, copied
    /// under one read guard.
    pub fn neighbors_out(&self, u: NodeId) -> GraphResult<Vec<(NodeId, u8, EdgeSnapshot)>> {
        if u.index() >= self.node_count() {
            return Err(GraphError::UnknownNode(u));
        }
        let snap = self.snapshot();
        Ok(self
            .out_edges(u)
            .map(|e| (self.edge_to[e.index()], self.edge_key[e.index()], snap.edge(e)))
            .collect())
    }

    /// Immutable copy of every edge matching `filter`.
    pub fn snapshot_edges<F>(&self, filter: F) -> Vec<EdgeSnapshot>
    where
        F: Fn(&EdgeSnapshot) -> bool,
    {
        let snap = self.snapshot();
        (0..self.edge_count() as u32)
            .map(EdgeId)
            .map(|e| snap.edge(e))
            .filter(|s| filter(s))
            .collect()
    }

    pub fn risk_statistics(&self) -> RiskStatistics {
        let state = self.state.read();
        let edges = state.risk.len();
        let mut nonzero = 0usize;
        let mut sum = 0.0f64;
        let mut max = 0.0f32;
        for &r in &state.risk {
            if r > 0.0 {
                nonzero += 1;
            }
            sum += r as f64;
            max = max.max(r);
        }
        RiskStatistics {
            edges,
            nonzero,
            mean: if edges == 0 { 0.0 } else { (sum / edges as f64) as f32 },
            max,
        }
    }

    /// Batches committed so far.
    pub fn risk_generation(&self) -> u64 {
        self.state.read().generation
    }

    // ── Mutation (single-writer discipline) ───────────────────────────────

    /// Clamp `risk`, recompute the stored weight, and stamp `now` — one
    /// atomic write.  Listeners observe it as a batch of one.
    pub fn update_edge_risk(&self, key: EdgeKey, risk: f32, now: Timestamp) -> GraphResult<()> {
        let edge = self.edge_id(key).ok_or(GraphError::UnknownEdge(key))?;

        let generation = {
            let mut state = self.state.write();
            self.apply_risk(&mut state, edge, risk, now);
            state.generation += 1;
            state.generation
        };
        self.notify(generation, &[edge]);
        Ok(())
    }

    /// Apply every entry of `updates` in one critical section and emit a
    /// single change notification.
    ///
    /// Unknown keys are collected into the returned outcome; they never
    /// corrupt state or abort the rest of the batch.
    pub fn batch_update_risks(
        &self,
        updates: &FxHashMap<EdgeKey, f32>,
        now: Timestamp,
    ) -> GraphResult<BatchOutcome> {
        let mut resolved = Vec::with_capacity(updates.len());
        let mut unknown = Vec::new();
        for (&key, &risk) in updates {
            match self.edge_id(key) {
                Some(edge) => resolved.push((edge, risk)),
                None => unknown.push(key),
            }
        }

        let generation = {
            let mut state = self.state.write();
            for &(edge, risk) in &resolved {
                self.apply_risk(&mut state, edge, risk, now);
            }
            state.generation += 1;
            state.generation
        };

        let changed: Vec<EdgeId> = resolved.iter().map(|&(e, _)| e).collect();
        debug!(
            generation,
            applied = changed.len(),
            unknown = unknown.len(),
            "committed risk batch"
        );
        self.notify(generation, &changed);

        Ok(BatchOutcome { applied: changed.len(), unknown })
    }

    /// Zero the risk of every edge (one batch).  Used by simulation reset.
    pub fn reset_risks(&self, now: Timestamp) {
        let (generation, changed) = {
            let mut state = self.state.write();
            let changed: Vec<EdgeId> = (0..state.risk.len() as u32)
                .map(EdgeId)
                .filter(|e| state.risk[e.index()] != 0.0)
                .collect();
            for &edge in &changed {
                self.apply_risk(&mut state, edge, 0.0, now);
            }
            state.generation += 1;
            (state.generation, changed)
        };
        self.notify(generation, &changed);
    }

    fn apply_risk(&self, state: &mut RiskState, edge: EdgeId, risk: f32, now: Timestamp) {
        let clamped = if risk.is_finite() { risk.clamp(0.0, 1.0) } else { 0.0 };
        let i = edge.index();
        state.risk[i] = clamped;
        state.weight[i] = self.edge_length_m[i] * (1.0 + clamped * self.weight_penalty);
        state.last_updated[i] = now;
    }

    // ── Listeners ─────────────────────────────────────────────────────────

    pub fn subscribe(&self, listener: Arc<dyn GraphListener>) {
        self.listeners.lock().push(listener);
    }

    fn notify(&self, generation: u64, changed: &[EdgeId]) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_risk_batch(generation, changed);
        }
    }
}

// ── GraphSnapshot ─────────────────────────────────────────────────────────────

/// Shared-lock read view used by routing and observability.
pub struct GraphSnapshot<'a> {
    store: &'a GraphStore,
    state: RwLockReadGuard<'a, RiskState>,
}

impl GraphSnapshot<'_> {
    #[inline]
    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.store.edge_count()
    }

    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.store.out_edges(node)
    }

    #[inline]
    pub fn edge_to(&self, edge: EdgeId) -> NodeId {
        self.store.edge_to[edge.index()]
    }

    #[inline]
    pub fn edge_from(&self, edge: EdgeId) -> NodeId {
        self.store.edge_from[edge.index()]
    }

    #[inline]
    pub fn length_m(&self, edge: EdgeId) -> f32 {
        self.store.edge_length_m[edge.index()]
    }

    #[inline]
    pub fn base_speed_kmh(&self, edge: EdgeId) -> f32 {
        self.store.edge_base_speed[edge.index()]
    }

    #[inline]
    pub fn class(&self, edge: EdgeId) -> HighwayClass {
        self.store.edge_class[edge.index()]
    }

    #[inline]
    pub fn risk(&self, edge: EdgeId) -> f32 {
        self.state.risk[edge.index()]
    }

    #[inline]
    pub fn node_position(&self, node: NodeId) -> GeoPoint {
        self.store.node_pos[node.index()]
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    /// Full attribute copy of one edge.
    pub fn edge(&self, edge: EdgeId) -> EdgeSnapshot {
        let i = edge.index();
        EdgeSnapshot {
            id: edge,
            key: self.store.edge_key_of(edge),
            length_m: self.store.edge_length_m[i],
            class: self.store.edge_class[i],
            base_speed_kmh: self.store.edge_base_speed[i],
            risk_score: self.state.risk[i],
            weight: self.state.weight[i],
            last_updated: self.state.last_updated[i],
        }
    }
}
