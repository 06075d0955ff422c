//! The hazard agent: owns the fusion engine, drains hazard observations,
//! and commits one risk batch per tick.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use masfro_bus::{Envelope, MessageBus, Payload};
use masfro_core::{AgentId, FusionSummary, SimClock};
use masfro_fusion::HazardFusion;
use masfro_graph::GraphStore;
use masfro_spatial::SpatialIndex;

use crate::error::AgentResult;
use crate::tickable::{TickReport, Tickable};

pub struct HazardAgent {
    id: AgentId,
    bus: Arc<MessageBus>,
    graph: Arc<GraphStore>,
    spatial: Arc<SpatialIndex>,
    clock: Arc<SimClock>,
    fusion: Mutex<HazardFusion>,
}

impl HazardAgent {
    pub const NAME: &'static str = "hazard";

    pub fn new(
        bus: Arc<MessageBus>,
        graph: Arc<GraphStore>,
        spatial: Arc<SpatialIndex>,
        fusion: HazardFusion,
        clock: Arc<SimClock>,
    ) -> Self {
        Self {
            id: AgentId::from(Self::NAME),
            bus,
            graph,
            spatial,
            clock,
            fusion: Mutex::new(fusion),
        }
    }

    /// Direct access for the simulation manager (scenario control, cache
    /// reset).  Tick and simulation phases never run concurrently, so this
    /// lock is uncontended in practice.
    pub fn fusion(&self) -> &Mutex<HazardFusion> {
        &self.fusion
    }

    /// Run one fusion pass immediately (admin trigger, simulation phase 2).
    pub fn run_fusion(&self) -> AgentResult<FusionSummary> {
        let now = self.clock.now();
        let summary = self
            .fusion
            .lock()
            .recalculate(&self.graph, &self.spatial, now)?;
        Ok(summary)
    }

    /// Drain the inbox, ingest observations, run one fusion pass, and answer
    /// any pending fuse requests.  Shared by the scheduler tick and the
    /// simulation manager's fusion phase so both commit exactly one batch.
    pub fn drain_and_fuse(&self) -> AgentResult<(usize, FusionSummary)> {
        let now = self.clock.now();
        let inbox = self.bus.drain(&self.id)?;
        let drained = inbox.len();

        let mut fuse_requests: Vec<Envelope> = Vec::new();
        {
            let mut fusion = self.fusion.lock();
            for envelope in inbox {
                match envelope.content {
                    Payload::Observation(observation) => {
                        if let Err(e) = fusion.ingest(observation, now) {
                            warn!(error = %e, "dropped invalid observation");
                        }
                    }
                    Payload::FuseRequest => fuse_requests.push(envelope),
                    other => {
                        warn!(content = ?other, "hazard agent ignoring unexpected payload");
                    }
                }
            }
        }

        // One pass per tick regardless of how many observations arrived.
        let summary = self.run_fusion()?;

        for request in fuse_requests {
            let reply = Envelope::reply_to(
                &request,
                self.id.clone(),
                Payload::FuseReply { summary: summary.clone() },
                now,
            );
            if let Err(e) = self.bus.send(reply) {
                warn!(error = %e, "failed to deliver fusion summary");
            }
        }

        Ok((drained, summary))
    }
}

impl Tickable for HazardAgent {
    fn name(&self) -> &AgentId {
        &self.id
    }

    fn tick(&self) -> AgentResult<TickReport> {
        let (drained, _summary) = self.drain_and_fuse()?;
        Ok(TickReport { work_items: drained })
    }
}
