//! The router agent: answers route and evacuation-center requests from the
//! bus by delegating to the routing engine.

use std::sync::Arc;

use tracing::warn;

use masfro_bus::{Envelope, MessageBus, Payload};
use masfro_core::{AgentId, EvacuationRepository, SimClock};
use masfro_routing::{RoutingEngine, RoutingError};

use crate::error::AgentResult;
use crate::tickable::{TickReport, Tickable};

pub struct RouterAgent {
    id: AgentId,
    bus: Arc<MessageBus>,
    engine: Arc<RoutingEngine>,
    evacuation: Arc<dyn EvacuationRepository>,
    clock: Arc<SimClock>,
}

impl RouterAgent {
    pub const NAME: &'static str = "router";

    pub fn new(
        bus: Arc<MessageBus>,
        engine: Arc<RoutingEngine>,
        evacuation: Arc<dyn EvacuationRepository>,
        clock: Arc<SimClock>,
    ) -> Self {
        Self { id: AgentId::from(Self::NAME), bus, engine, evacuation, clock }
    }

    pub fn engine(&self) -> &Arc<RoutingEngine> {
        &self.engine
    }

    fn answer(&self, request: &Envelope) -> Envelope {
        let now = self.clock.now();
        match &request.content {
            Payload::RouteRequest { start, end, preferences } => {
                match self.engine.compute_route(*start, *end, preferences) {
                    Ok(route) => Envelope::reply_to(
                        request,
                        self.id.clone(),
                        Payload::RouteReply { route },
                        now,
                    ),
                    Err(e) => Envelope::failure_to(
                        request,
                        self.id.clone(),
                        error_code(&e),
                        e.to_string(),
                        now,
                    ),
                }
            }
            Payload::EvacuationRequest { location, query, max_candidates, preferences } => {
                match self.engine.nearest_evacuation_center(
                    *location,
                    self.evacuation.as_ref(),
                    query.as_deref(),
                    *max_candidates,
                    preferences,
                ) {
                    Ok(choice) => Envelope::reply_to(
                        request,
                        self.id.clone(),
                        Payload::EvacuationReply { choice },
                        now,
                    ),
                    Err(e) => Envelope::failure_to(
                        request,
                        self.id.clone(),
                        error_code(&e),
                        e.to_string(),
                        now,
                    ),
                }
            }
            other => {
                warn!(content = ?other, "router agent ignoring unexpected payload");
                Envelope::failure_to(
                    request,
                    self.id.clone(),
                    "UNSUPPORTED",
                    "router answers route and evacuation requests only",
                    now,
                )
            }
        }
    }
}

impl Tickable for RouterAgent {
    fn name(&self) -> &AgentId {
        &self.id
    }

    fn tick(&self) -> AgentResult<TickReport> {
        let inbox = self.bus.drain(&self.id)?;
        let drained = inbox.len();

        for request in &inbox {
            let reply = self.answer(request);
            if let Err(e) = self.bus.send(reply) {
                warn!(error = %e, requester = %request.sender, "failed to deliver routing reply");
            }
        }

        Ok(TickReport { work_items: drained })
    }
}

/// Stable error codes surfaced to clients.
fn error_code(error: &RoutingError) -> &'static str {
    match error {
        RoutingError::Unavailable => "UNAVAILABLE",
        RoutingError::NotFound { .. } => "NOT_FOUND",
        RoutingError::NoPath => "NO_PATH",
        RoutingError::DeadlineExceeded => "DEADLINE_EXCEEDED",
        RoutingError::NoCenters => "NO_CENTERS",
        RoutingError::Repository(_) => "REPOSITORY_ERROR",
    }
}
