//! CSV graph loader.
//!
//! # File format
//!
//! The pre-generated graph arrives as two CSV files.
//!
//! `nodes.csv` — one row per junction:
//!
//! ```csv
//! node_id,lat,lon,street_count
//! 102733,14.6507,121.1029,4
//! 102734,14.6391,121.0957,3
//! ```
//!
//! `edges.csv` — one row per **directed** segment, referencing external node
//! ids.  Repeated `(u, v)` rows become parallel edges with ascending keys:
//!
//! ```csv
//! u,v,length_m,highway
//! 102733,102734,420.5,primary
//! 102734,102733,420.5,primary
//! ```
//!
//! Base speed is imputed from the highway class; the graph file carries none.
//! A failed load returns an error and the caller keeps its empty store, so
//! routing degrades to `Unavailable` rather than serving a half-built graph.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use masfro_core::{GeoPoint, GraphConfig, HighwayClass};

use crate::builder::GraphBuilder;
use crate::error::{GraphError, GraphResult};
use crate::store::GraphStore;

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NodeRecord {
    node_id: u64,
    lat: f32,
    lon: f32,
    street_count: u16,
}

#[derive(Deserialize)]
struct EdgeRecord {
    u: u64,
    v: u64,
    length_m: f32,
    highway: String,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a graph from the `nodes.csv` / `edges.csv` pair.
pub fn load_from_csv(
    nodes_path: &Path,
    edges_path: &Path,
    config: &GraphConfig,
) -> GraphResult<GraphStore> {
    let nodes = std::fs::File::open(nodes_path)?;
    let edges = std::fs::File::open(edges_path)?;
    load_from_readers(nodes, edges, config)
}

/// Like [`load_from_csv`] but accepts any `Read` sources.
///
/// Useful for testing (pass `std::io::Cursor`s).
pub fn load_from_readers<N: Read, E: Read>(
    nodes: N,
    edges: E,
    config: &GraphConfig,
) -> GraphResult<GraphStore> {
    let mut builder = GraphBuilder::new(config.bbox);

    let mut node_reader = csv::Reader::from_reader(nodes);
    for result in node_reader.deserialize::<NodeRecord>() {
        let row = result.map_err(|e| GraphError::Parse(e.to_string()))?;
        builder.add_node(
            row.node_id,
            GeoPoint::new(row.lat, row.lon),
            row.street_count,
        )?;
    }

    let mut edge_reader = csv::Reader::from_reader(edges);
    for result in edge_reader.deserialize::<EdgeRecord>() {
        let row = result.map_err(|e| GraphError::Parse(e.to_string()))?;
        let u = builder
            .node_by_external(row.u)
            .ok_or(GraphError::UnknownExternalId(row.u))?;
        let v = builder
            .node_by_external(row.v)
            .ok_or(GraphError::UnknownExternalId(row.v))?;
        builder.add_edge(u, v, row.length_m, HighwayClass::parse(&row.highway))?;
    }

    let store = builder.build(config.weight_penalty);
    info!(
        nodes = store.node_count(),
        edges = store.edge_count(),
        "road graph loaded"
    );
    Ok(store)
}
