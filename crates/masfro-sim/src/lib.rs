//! `masfro-sim` — deterministic hazard-scenario replay.
//!
//! A simulation binds a mode (light / medium / heavy) to a synthetic
//! flood-depth raster family and replays it in fixed-phase ticks:
//!
//! ```text
//! run_tick():
//!   ① Collection — synthetic gauge readings and crowd reports for the
//!                  current (mode, time_step) land in the hazard inbox.
//!   ② Fusion     — the hazard agent drains and commits exactly one batch.
//!   ③ Routing    — queued route requests are answered FIFO.
//! ```
//!
//! While a simulation runs the `SimGate` is raised, so the background
//! scheduler yields and the phase order above is the only agent driver.
//!
//! # Crate layout
//!
//! | Module       | Contents                                             |
//! |--------------|------------------------------------------------------|
//! | [`scenario`] | `ScenarioRasterProvider`, synthetic gauge sites      |
//! | [`manager`]  | `SimulationManager` — start/tick/stop/reset          |
//! | [`error`]    | `SimError`, `SimResult<T>`                           |

pub mod error;
pub mod manager;
pub mod scenario;


pub use error::{SimError, SimResult};
pub use manager::{
    QueuedRouteRequest, SimulationManager, SimulationMode, SimulationStats, SimulationStatus,
    TickSummary,
};
pub use scenario::ScenarioRasterProvider;

/// Last raster snapshot index in every scenario family.
pub const MAX_TIME_STEP: u8 = 18;
