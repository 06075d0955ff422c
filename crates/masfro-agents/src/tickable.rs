//! The `Tickable` capability — the only contract the scheduler knows.

use masfro_core::AgentId;

use crate::error::AgentResult;

/// What one tick accomplished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Messages drained, observations processed, requests answered.
    pub work_items: usize,
}

/// An agent the scheduler can drive.
///
/// `tick` must be safe to call from any thread but is never invoked
/// concurrently for the same agent — the scheduler serializes per-agent
/// ticks and only parallelizes across agents.
pub trait Tickable: Send + Sync {
    /// Bus queue name and log identity.
    fn name(&self) -> &AgentId;

    /// Perform one unit of work: drain the inbox, act, reply.
    fn tick(&self) -> AgentResult<TickReport>;

    /// Health probe consulted before an isolated agent is re-admitted.
    fn healthy(&self) -> bool {
        true
    }
}
