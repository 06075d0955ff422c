//! Bus error type.

use thiserror::Error;

use masfro_core::AgentId;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("no queue registered for agent '{0}'")]
    QueueNotFound(AgentId),

    #[error("queue for agent '{agent}' is full (capacity {capacity})")]
    QueueFull { agent: AgentId, capacity: usize },

    #[error("agent '{0}' is already registered")]
    AlreadyRegistered(AgentId),
}

pub type BusResult<T> = Result<T, BusError>;
