//! Fusion-subsystem error type.

use thiserror::Error;

use masfro_graph::GraphError;

/// Errors that abort a fusion pass.
///
/// Raster failures are *not* here: the pass degrades to station
/// interpolation and counts them instead.
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("graph batch write failed: {0}")]
    Graph(#[from] GraphError),
}

pub type FusionResult<T> = Result<T, FusionError>;
