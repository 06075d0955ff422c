//! `masfro-fusion` — the authoritative writer of edge risk.
//!
//! The fusion engine ingests heterogeneous hazard observations into bounded
//! caches and, on each recalculation pass, recomputes risk for every edge
//! that might have changed and commits the result as **exactly one** batch
//! write to the graph.  Processing N observations never causes N graph-wide
//! recomputations.
//!
//! # Crate layout
//!
//! | Module     | Contents                                              |
//! |------------|-------------------------------------------------------|
//! | [`cache`]  | `StationCache` (LRU), `ScoutCache` (grid ring buffers)|
//! | [`raster`] | `RasterProvider` trait, `RasterError`                 |
//! | [`engine`] | `HazardFusion` — ingest + the recalculation pass      |
//! | [`error`]  | `FusionError`, `FusionResult<T>`                      |

pub mod cache;
pub mod engine;
pub mod error;
pub mod raster;

#[cfg(test)]
mod tests;

pub use cache::{ScoutCache, StationCache};
pub use engine::HazardFusion;
pub use error::{FusionError, FusionResult};
pub use raster::{RasterError, RasterProvider};
