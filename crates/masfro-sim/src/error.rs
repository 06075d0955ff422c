//! Simulation-subsystem error type.

use thiserror::Error;

use masfro_agents::AgentError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("a simulation is already running")]
    AlreadyRunning,

    #[error("no simulation is running")]
    NotRunning,

    #[error("run_tick is not reentrant; a tick is already in progress")]
    TickInProgress,

    #[error("time step {0} outside 1..=18")]
    BadTimeStep(u8),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

pub type SimResult<T> = Result<T, SimError>;
