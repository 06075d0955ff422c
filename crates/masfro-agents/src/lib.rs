//! `masfro-agents` — the multi-agent coordination kernel.
//!
//! Agents share one capability: [`Tickable`].  The scheduler drives every
//! registered agent at a fixed cadence (yielding entirely while a simulation
//! runs); each tick drains the agent's bus inbox and does one unit of work.
//! Agents never call each other directly — all coordination goes through the
//! bus, and replies are correlated by conversation id.  The orchestrator is
//! the only component that knows mission shapes; agents do not reference it.
//!
//! # Crate layout
//!
//! | Module           | Contents                                          |
//! |------------------|---------------------------------------------------|
//! | [`tickable`]     | `Tickable` capability, `TickReport`               |
//! | [`scheduler`]    | `AgentScheduler`, `SimGate`, per-agent stats      |
//! | [`fetch`]        | `RetryPolicy`, `CircuitBreaker` for fetchers      |
//! | [`orchestrator`] | Mission FSM over the bus                          |
//! | [`agents`]       | Hazard / Router / Scout / Flood agents            |
//! | [`error`]        | `AgentError`, `AgentResult<T>`                    |

pub mod agents;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod scheduler;
pub mod tickable;


pub use agents::{FloodAgent, Gazetteer, HazardAgent, RouterAgent, RuleClassifier, ScoutAgent};
pub use error::{AgentError, AgentResult};
pub use fetch::{CircuitBreaker, CircuitState, RetryPolicy};
pub use orchestrator::{MissionId, MissionKind, MissionSnapshot, MissionState, Orchestrator};
pub use scheduler::{AgentScheduler, AgentStatus, SimGate, TickStats};
pub use tickable::{TickReport, Tickable};
