//! A* search over a graph snapshot.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use masfro_core::{EdgeId, GeoPoint, NodeId, SimClock, Timestamp};
use masfro_graph::GraphSnapshot;

use crate::error::{RoutingError, RoutingResult};

/// A found path: node sequence plus the exact edges traversed
/// (`edges.len() == nodes.len() - 1`).
#[derive(Debug)]
pub struct SearchResult {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

/// Heap entry ordered for a max-heap so that the *smallest* `f` pops first,
/// tie-broken on lower `g`, then lower node id — this makes equal-cost
/// searches fully deterministic.
struct HeapEntry {
    f: f64,
    g: f64,
    node: NodeId,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.g.total_cmp(&self.g))
            .then_with(|| other.node.0.cmp(&self.node.0))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// Risk-aware A* from `from` to `to`.
///
/// - `penalty` — the mode's risk penalty in the weight `L + penalty·L·r`.
/// - `threshold` — risk at or above this is impassable (`f32::INFINITY`
///   disables the cut-off).
/// - `deadline` — simulated-time instant after which the search aborts;
///   checked on every heap pop.
///
/// Returns `Ok(None)` when the endpoints are disconnected under the given
/// threshold.
pub fn astar(
    snapshot: &GraphSnapshot<'_>,
    from: NodeId,
    to: NodeId,
    penalty: f64,
    threshold: f32,
    clock: &SimClock,
    deadline: Timestamp,
) -> RoutingResult<Option<SearchResult>> {
    if from == to {
        return Ok(Some(SearchResult { nodes: vec![from], edges: vec![] }));
    }

    let n = snapshot.node_count();
    let goal = snapshot.node_position(to);

    let mut dist = vec![f64::INFINITY; n];
    let mut prev_edge = vec![EdgeId::INVALID; n];
    dist[from.index()] = 0.0;

    let mut heap = BinaryHeap::new();
    heap.push(HeapEntry {
        f: heuristic(snapshot.node_position(from), goal),
        g: 0.0,
        node: from,
    });

    while let Some(HeapEntry { g, node, .. }) = heap.pop() {
        if clock.now() > deadline {
            return Err(RoutingError::DeadlineExceeded);
        }
        if node == to {
            return Ok(Some(reconstruct(snapshot, &prev_edge, from, to)));
        }
        // Skip stale heap entries.
        if g > dist[node.index()] {
            continue;
        }

        // Edges are CSR-sorted by (u, v, k): parallel segments to the same
        // neighbor are adjacent, so one forward scan finds the minimum
        // weight per neighbor.
        let mut iter = snapshot.out_edges(node).peekable();
        while let Some(edge) = iter.next() {
            let neighbor = snapshot.edge_to(edge);
            let mut best_weight = edge_weight(snapshot, edge, penalty, threshold);
            let mut best_edge = edge;
            while let Some(&parallel) = iter.peek() {
                if snapshot.edge_to(parallel) != neighbor {
                    break;
                }
                let w = edge_weight(snapshot, parallel, penalty, threshold);
                if w < best_weight {
                    best_weight = w;
                    best_edge = parallel;
                }
                iter.next();
            }

            if !best_weight.is_finite() {
                continue; // every parallel key impassable
            }

            let candidate = g + best_weight;
            if candidate < dist[neighbor.index()] {
                dist[neighbor.index()] = candidate;
                prev_edge[neighbor.index()] = best_edge;
                heap.push(HeapEntry {
                    f: candidate + heuristic(snapshot.node_position(neighbor), goal),
                    g: candidate,
                    node: neighbor,
                });
            }
        }
    }

    Ok(None)
}

/// `L + penalty·L·r`, or `∞` past the risk threshold.
#[inline]
fn edge_weight(snapshot: &GraphSnapshot<'_>, edge: EdgeId, penalty: f64, threshold: f32) -> f64 {
    let risk = snapshot.risk(edge);
    if risk >= threshold {
        return f64::INFINITY;
    }
    let length = snapshot.length_m(edge) as f64;
    length + penalty * length * risk as f64
}

/// Admissible heuristic: straight-line metres (`w ≥ L` for every edge).
#[inline]
fn heuristic(node: GeoPoint, goal: GeoPoint) -> f64 {
    node.distance_m(goal) as f64
}

fn reconstruct(
    snapshot: &GraphSnapshot<'_>,
    prev_edge: &[EdgeId],
    from: NodeId,
    to: NodeId,
) -> SearchResult {
    let mut edges = Vec::new();
    let mut nodes = vec![to];
    let mut current = to;
    while current != from {
        let edge = prev_edge[current.index()];
        debug_assert_ne!(edge, EdgeId::INVALID, "broken back-pointer chain");
        edges.push(edge);
        current = snapshot.edge_from(edge);
        nodes.push(current);
    }
    edges.reverse();
    nodes.reverse();
    SearchResult { nodes, edges }
}
