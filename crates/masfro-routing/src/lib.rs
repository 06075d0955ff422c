//! `masfro-routing` — risk-aware pathfinding over the shared road graph.
//!
//! # Weight function
//!
//! For an edge of length `L` metres with risk `r` under mode penalty `p`:
//!
//! ```text
//! w = L + p · L · r        (r ≥ threshold ⇒ w = ∞, edge impassable)
//! ```
//!
//! With `p = 0` the search degenerates to pure shortest-distance Dijkstra;
//! with the safest-mode penalty, risky edges become prohibitively long.  The
//! A* heuristic is plain haversine metres — admissible for every penalty
//! because `w ≥ L` on every finite edge.
//!
//! For parallel segments the effective weight between two nodes is the
//! minimum over parallel keys, so a flooded flyover cannot be bypassed by a
//! clean twin key pretending to be the same road.
//!
//! # Crate layout
//!
//! | Module      | Contents                                            |
//! |-------------|-----------------------------------------------------|
//! | [`engine`]  | `RoutingEngine` — snap, search ladder, baseline     |
//! | [`astar`]   | The A* search itself                                |
//! | [`metrics`] | One-sweep path metrics and structured warnings      |
//! | [`evac`]    | Nearest-evacuation-center selection                 |
//! | [`error`]   | `RoutingError`, `RoutingResult<T>`                  |

pub mod astar;
pub mod engine;
pub mod error;
pub mod evac;
pub mod metrics;

#[cfg(test)]
mod tests;

pub use engine::RoutingEngine;
pub use error::{RoutingError, RoutingResult};
