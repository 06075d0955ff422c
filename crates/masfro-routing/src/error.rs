//! Routing-subsystem error type.
//!
//! These map 1:1 onto the HTTP layer's stable error codes: every variant is
//! fatal to the request only, never to the process.

use thiserror::Error;

use masfro_core::RepositoryError;

#[derive(Debug, Error)]
pub enum RoutingError {
    /// The graph is not loaded; the caller may retry after a load.
    #[error("road graph unavailable")]
    Unavailable,

    /// An endpoint could not be snapped to the network.
    #[error("{which} point is {distance_m:.0} m from the nearest road node (max {max_m:.0} m)")]
    NotFound {
        which: &'static str,
        distance_m: f32,
        max_m: f32,
    },

    /// The endpoints are not connected under the active risk threshold.
    #[error("no path between the requested endpoints")]
    NoPath,

    /// The search exceeded its per-request deadline.
    #[error("routing deadline exceeded")]
    DeadlineExceeded,

    /// No active evacuation center with free capacity was reachable.
    #[error("no evacuation center available")]
    NoCenters,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
