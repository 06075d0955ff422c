//! The `MessageBus`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use masfro_core::AgentId;

use crate::envelope::{Envelope, Recipient};
use crate::error::{BusError, BusResult};
use crate::DEFAULT_QUEUE_CAPACITY;

struct Queue {
    capacity: usize,
    inner: Mutex<VecDeque<Envelope>>,
    /// Signalled on every push, for blocking receivers.
    available: Condvar,
}

impl Queue {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }
}

/// Named, bounded FIFO queues — one per registered agent.
///
/// Guarantees: FIFO per `(sender, receiver)` pair (a receiver has exactly one
/// queue, so per-sender order is send order), at-most-once delivery (`recv`
/// removes), and typed failures on unknown or full queues.
#[derive(Default)]
pub struct MessageBus {
    queues: RwLock<FxHashMap<AgentId, Arc<Queue>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ──────────────────────────────────────────────────────

    /// Create the inbox for `agent` with the given capacity.
    pub fn register(&self, agent: AgentId, capacity: usize) -> BusResult<()> {
        let mut queues = self.queues.write();
        if queues.contains_key(&agent) {
            return Err(BusError::AlreadyRegistered(agent));
        }
        debug!(agent = %agent, capacity, "registered bus queue");
        queues.insert(agent, Arc::new(Queue::new(capacity)));
        Ok(())
    }

    /// [`register`](Self::register) with the default capacity.
    pub fn register_default(&self, agent: AgentId) -> BusResult<()> {
        self.register(agent, DEFAULT_QUEUE_CAPACITY)
    }

    // ── Send ──────────────────────────────────────────────────────────────

    /// Enqueue `envelope` on its receiver's queue.
    ///
    /// Broadcast envelopes go to [`broadcast`](Self::broadcast) instead; a
    /// broadcast recipient here is rejected as not-found.
    pub fn send(&self, envelope: Envelope) -> BusResult<()> {
        let receiver = match &envelope.receiver {
            Recipient::Agent(id) => id.clone(),
            Recipient::Broadcast => {
                self.broadcast(envelope, true);
                return Ok(());
            }
        };

        let queue = self
            .queue(&receiver)
            .ok_or_else(|| BusError::QueueNotFound(receiver.clone()))?;

        let mut inner = queue.inner.lock();
        if inner.len() >= queue.capacity {
            return Err(BusError::QueueFull { agent: receiver, capacity: queue.capacity });
        }
        inner.push_back(envelope);
        queue.available.notify_one();
        Ok(())
    }

    /// Deliver a copy of `envelope` to every registered queue, optionally
    /// excluding the sender's own.  Returns the number of queues reached;
    /// full queues are skipped with a warning.
    pub fn broadcast(&self, envelope: Envelope, exclude_sender: bool) -> usize {
        let queues: Vec<(AgentId, Arc<Queue>)> = {
            let map = self.queues.read();
            map.iter().map(|(id, q)| (id.clone(), q.clone())).collect()
        };

        let mut delivered = 0;
        for (agent, queue) in queues {
            if exclude_sender && agent == envelope.sender {
                continue;
            }
            let mut inner = queue.inner.lock();
            if inner.len() >= queue.capacity {
                warn!(agent = %agent, "broadcast skipped full queue");
                continue;
            }
            inner.push_back(envelope.clone());
            queue.available.notify_one();
            delivered += 1;
        }
        delivered
    }

    // ── Receive ───────────────────────────────────────────────────────────

    /// Pop the oldest message for `agent`, or `None` if the inbox is empty.
    pub fn recv(&self, agent: &AgentId) -> BusResult<Option<Envelope>> {
        let queue = self
            .queue(agent)
            .ok_or_else(|| BusError::QueueNotFound(agent.clone()))?;
        let mut inner = queue.inner.lock();
        Ok(inner.pop_front())
    }

    /// Like [`recv`](Self::recv), but blocks up to `timeout` for a message.
    pub fn recv_timeout(
        &self,
        agent: &AgentId,
        timeout: Duration,
    ) -> BusResult<Option<Envelope>> {
        let queue = self
            .queue(agent)
            .ok_or_else(|| BusError::QueueNotFound(agent.clone()))?;

        let mut inner = queue.inner.lock();
        if let Some(envelope) = inner.pop_front() {
            return Ok(Some(envelope));
        }
        queue.available.wait_for(&mut inner, timeout);
        Ok(inner.pop_front())
    }

    /// Drain every pending message for `agent`, oldest first.
    pub fn drain(&self, agent: &AgentId) -> BusResult<Vec<Envelope>> {
        let queue = self
            .queue(agent)
            .ok_or_else(|| BusError::QueueNotFound(agent.clone()))?;
        let mut inner = queue.inner.lock();
        Ok(inner.drain(..).collect())
    }

    // ── Introspection ─────────────────────────────────────────────────────

    pub fn queue_size(&self, agent: &AgentId) -> BusResult<usize> {
        let queue = self
            .queue(agent)
            .ok_or_else(|| BusError::QueueNotFound(agent.clone()))?;
        let inner = queue.inner.lock();
        Ok(inner.len())
    }

    /// Discard all pending messages for `agent`; returns how many.
    pub fn clear(&self, agent: &AgentId) -> BusResult<usize> {
        let queue = self
            .queue(agent)
            .ok_or_else(|| BusError::QueueNotFound(agent.clone()))?;
        let mut inner = queue.inner.lock();
        let dropped = inner.len();
        inner.clear();
        Ok(dropped)
    }

    pub fn registered_agents(&self) -> Vec<AgentId> {
        self.queues.read().keys().cloned().collect()
    }

    fn queue(&self, agent: &AgentId) -> Option<Arc<Queue>> {
        self.queues.read().get(agent).cloned()
    }
}
