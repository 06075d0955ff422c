//! Graph-subsystem error type.

use thiserror::Error;

use masfro_core::{EdgeKey, NodeId};

/// Errors produced by `masfro-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0} not found in graph")]
    UnknownNode(NodeId),

    #[error("no node with external id {0}")]
    UnknownExternalId(u64),

    #[error("edge {0} not found in graph")]
    UnknownEdge(EdgeKey),

    #[error("duplicate node with external id {0}")]
    DuplicateNode(u64),

    #[error("edge ({u} → {v}) has non-positive length {length_m}")]
    BadEdgeLength { u: NodeId, v: NodeId, length_m: f32 },

    #[error("graph file parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;
