//! Agent-subsystem error type.

use thiserror::Error;
use uuid::Uuid;

use masfro_bus::BusError;
use masfro_core::FetchError;
use masfro_fusion::FusionError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("mission limit reached ({0} concurrent)")]
    MissionLimit(usize),

    #[error("unknown mission {0}")]
    UnknownMission(Uuid),

    #[error("mission {0} already finished")]
    MissionFinished(Uuid),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type AgentResult<T> = Result<T, AgentError>;
