//! `masfro-graph` — the shared road multigraph.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edges[ out_start[n] .. out_start[n+1] ]
//! ```
//!
//! Edges are sorted by `(u, v, k)`, so parallel segments between the same
//! endpoints are adjacent — the routing engine exploits this to take the
//! minimum weight over parallel keys in a single scan.
//!
//! # Concurrency
//!
//! Topology (nodes, endpoints, lengths, classes) is immutable after load and
//! read without locking.  The mutable per-edge state (risk, weight,
//! last-updated) sits behind one `parking_lot::RwLock`: all mutation funnels
//! through [`GraphStore::update_edge_risk`] / [`GraphStore::batch_update_risks`]
//! (single-writer discipline), while readers take the lock in shared mode via
//! [`GraphStore::snapshot`].  Risk and weight are written under the same
//! guard, so readers can never observe them out of sync.
//!
//! # Crate layout
//!
//! | Module      | Contents                                               |
//! |-------------|--------------------------------------------------------|
//! | [`builder`] | `GraphBuilder` — incremental construction, CSR build   |
//! | [`store`]   | `GraphStore`, snapshots, listeners, risk statistics    |
//! | [`load`]    | CSV loader for the pre-generated graph file pair       |
//! | [`error`]   | `GraphError`, `GraphResult<T>`                         |

pub mod builder;
pub mod error;
pub mod load;
pub mod store;

#[cfg(test)]
mod tests;

pub use builder::GraphBuilder;
pub use error::{GraphError, GraphResult};
pub use load::{load_from_csv, load_from_readers};
pub use store::{
    BatchOutcome, EdgeSnapshot, GraphListener, GraphSnapshot, GraphStore, NodeSnapshot,
    RiskStatistics,
};
