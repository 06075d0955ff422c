//! `masfro-spatial` — geographic indexes over the road graph.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`index`]    | `SpatialIndex` — node k-NN, edges-within-radius         |
//! | [`waterway`] | Waterway polylines and the per-node proximity prior     |
//!
//! # Coordinate handling
//!
//! All R-trees store points projected to local metres (equirectangular
//! around the graph's centroid), so squared tree distances are metres² and
//! radius queries need no degree/metre conversion.  Nearest-node results are
//! refined with exact haversine over a small candidate set, which keeps the
//! k-NN guarantee exact.
//!
//! The index is built once from the loaded graph; if the node set ever
//! changes the index must be rebuilt.

pub mod index;
pub mod waterway;


pub use index::SpatialIndex;
pub use waterway::{Waterway, WaterwayKind, RIVER_DECAY_M};
