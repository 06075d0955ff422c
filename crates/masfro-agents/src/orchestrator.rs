//! The orchestrator: missions as finite-state machines over the bus.
//!
//! A mission breaks a user command into a sequence of agent requests.  Each
//! step posts one REQUEST with a fresh conversation id and waits (by polling
//! its inbox on tick, never blocking) for the matching REPLY or FAILURE.
//! Agents never reference the orchestrator back; the conversation id is the
//! only link.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use masfro_bus::{ConversationId, Envelope, MessageBus, Payload, Performative};
use masfro_core::{
    AgentId, GeoPoint, OrchestratorConfig, RoutePreferences, SimClock, Timestamp,
};

use crate::agents::{flood::FloodAgent, hazard::HazardAgent, router::RouterAgent, scout::ScoutAgent};
use crate::error::{AgentError, AgentResult};
use crate::tickable::{TickReport, Tickable};

// ── Mission model ─────────────────────────────────────────────────────────────

/// Mission identity.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct MissionId(pub Uuid);

impl std::fmt::Display for MissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The supported mission shapes.
#[derive(Clone, Debug)]
pub enum MissionKind {
    /// Geocode (optional) → collect → fuse.
    AssessRisk { location: Option<String> },
    /// One router request answering a distress call.
    CoordinatedEvacuation { user_location: GeoPoint, message: String },
    /// Single-step route computation.
    RouteCalculation {
        start: GeoPoint,
        end: GeoPoint,
        preferences: RoutePreferences,
    },
    /// Single-step evacuation-center lookup.
    FindEvacuationCenter {
        location: GeoPoint,
        query: Option<String>,
        max_centers: usize,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MissionState {
    Pending,
    WaitingReply,
    Completed,
    Failed,
    Cancelled,
}

impl MissionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MissionState::Completed | MissionState::Failed | MissionState::Cancelled
        )
    }
}

/// One accumulated step result.
#[derive(Clone, Debug)]
pub struct StepRecord {
    pub agent: AgentId,
    pub label: &'static str,
    pub reply: Payload,
}

struct PendingStep {
    agent: AgentId,
    conversation: ConversationId,
    sent_at: Timestamp,
}

struct Mission {
    id: MissionId,
    kind: MissionKind,
    state: MissionState,
    step_index: usize,
    pending: Option<PendingStep>,
    results: Vec<StepRecord>,
    failure: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

/// Public read view of a mission.
#[derive(Clone, Debug)]
pub struct MissionSnapshot {
    pub id: MissionId,
    pub kind: MissionKind,
    pub state: MissionState,
    pub step_index: usize,
    pub pending_reply_from: Option<AgentId>,
    pub results: Vec<StepRecord>,
    pub failure: Option<String>,
    pub explanation: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct Orchestrator {
    id: AgentId,
    bus: Arc<MessageBus>,
    clock: Arc<SimClock>,
    config: OrchestratorConfig,
    missions: Mutex<FxHashMap<Uuid, Mission>>,
}

impl Orchestrator {
    pub const NAME: &'static str = "orchestrator";

    pub fn new(bus: Arc<MessageBus>, config: OrchestratorConfig, clock: Arc<SimClock>) -> Self {
        Self {
            id: AgentId::from(Self::NAME),
            bus,
            clock,
            config,
            missions: Mutex::new(FxHashMap::default()),
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Start a mission: post its first REQUEST and track the reply.
    ///
    /// Rejected synchronously when the concurrency cap is reached or the
    /// first request cannot be enqueued.
    pub fn start_mission(&self, kind: MissionKind) -> AgentResult<MissionId> {
        let now = self.clock.now();
        let mut missions = self.missions.lock();

        let active = missions.values().filter(|m| !m.state.is_terminal()).count();
        if active >= self.config.max_concurrent_missions {
            return Err(AgentError::MissionLimit(active));
        }

        let id = MissionId(Uuid::new_v4());
        let mut mission = Mission {
            id,
            kind,
            state: MissionState::Pending,
            step_index: 0,
            pending: None,
            results: Vec::new(),
            failure: None,
            created_at: now,
            updated_at: now,
        };
        self.post_step(&mut mission, now)?;
        info!(mission = %id, state = ?mission.state, "mission started");
        missions.insert(id.0, mission);
        Ok(id)
    }

    /// Cancel a mission; later replies for it are discarded.
    pub fn cancel(&self, id: MissionId) -> AgentResult<()> {
        let mut missions = self.missions.lock();
        let mission = missions
            .get_mut(&id.0)
            .ok_or(AgentError::UnknownMission(id.0))?;
        if mission.state.is_terminal() {
            return Err(AgentError::MissionFinished(id.0));
        }
        mission.state = MissionState::Cancelled;
        mission.pending = None;
        mission.updated_at = self.clock.now();
        info!(mission = %id, "mission cancelled");
        Ok(())
    }

    pub fn status(&self, id: MissionId) -> Option<MissionSnapshot> {
        let missions = self.missions.lock();
        missions.get(&id.0).map(snapshot)
    }

    /// Missions currently not in a terminal state.
    pub fn active_missions(&self) -> usize {
        self.missions
            .lock()
            .values()
            .filter(|m| !m.state.is_terminal())
            .count()
    }

    // ── Step plans ────────────────────────────────────────────────────────

    /// The request for `step_index` of `kind`, or `None` past the last step.
    fn request_for(&self, kind: &MissionKind, step_index: usize) -> Option<(AgentId, &'static str, Payload)> {
        match kind {
            MissionKind::AssessRisk { location } => {
                // The geocode step only exists when a location was given.
                let steps: Vec<(AgentId, &'static str, Payload)> = location
                    .iter()
                    .map(|loc| {
                        (
                            AgentId::from(ScoutAgent::NAME),
                            "geocode",
                            Payload::GeocodeRequest { location: loc.clone() },
                        )
                    })
                    .chain([
                        (
                            AgentId::from(FloodAgent::NAME),
                            "collect",
                            Payload::CollectRequest,
                        ),
                        (
                            AgentId::from(HazardAgent::NAME),
                            "fuse",
                            Payload::FuseRequest,
                        ),
                    ])
                    .collect();
                steps.into_iter().nth(step_index)
            }

            MissionKind::CoordinatedEvacuation { user_location, message } => (step_index == 0)
                .then(|| {
                    (
                        AgentId::from(RouterAgent::NAME),
                        "find_evacuation_center",
                        Payload::EvacuationRequest {
                            location: *user_location,
                            query: Some(message.clone()),
                            max_candidates: 5,
                            preferences: RoutePreferences::default(),
                        },
                    )
                }),

            MissionKind::RouteCalculation { start, end, preferences } => (step_index == 0)
                .then(|| {
                    (
                        AgentId::from(RouterAgent::NAME),
                        "route",
                        Payload::RouteRequest {
                            start: *start,
                            end: *end,
                            preferences: *preferences,
                        },
                    )
                }),

            MissionKind::FindEvacuationCenter { location, query, max_centers } => (step_index
                == 0)
                .then(|| {
                    (
                        AgentId::from(RouterAgent::NAME),
                        "find_evacuation_center",
                        Payload::EvacuationRequest {
                            location: *location,
                            query: query.clone(),
                            max_candidates: *max_centers,
                            preferences: RoutePreferences::default(),
                        },
                    )
                }),
        }
    }

    /// Post the current step's request, or complete the mission when the
    /// plan is exhausted.
    fn post_step(&self, mission: &mut Mission, now: Timestamp) -> AgentResult<()> {
        match self.request_for(&mission.kind, mission.step_index) {
            None => {
                mission.state = MissionState::Completed;
                mission.pending = None;
                mission.updated_at = now;
                Ok(())
            }
            Some((agent, label, payload)) => {
                let envelope = Envelope::request(self.id.clone(), agent.clone(), payload, now);
                let conversation = envelope.conversation_id;
                self.bus.send(envelope)?;
                debug!(mission = %mission.id, step = mission.step_index, agent = %agent, label, "step posted");
                mission.pending = Some(PendingStep { agent, conversation, sent_at: now });
                mission.state = MissionState::WaitingReply;
                mission.updated_at = now;
                Ok(())
            }
        }
    }

    // ── Tick internals ────────────────────────────────────────────────────

    fn handle_envelope(&self, envelope: Envelope, now: Timestamp) {
        if let Payload::CancelMission { mission_id } = envelope.content {
            match self.cancel(MissionId(mission_id)) {
                Ok(()) => {}
                Err(e) => warn!(mission = %mission_id, error = %e, "cancel request ignored"),
            }
            return;
        }

        let mut missions = self.missions.lock();
        let Some(mission) = missions.values_mut().find(|m| {
            m.pending
                .as_ref()
                .is_some_and(|p| p.conversation == envelope.conversation_id)
        }) else {
            // Late reply for a finished, timed-out, or cancelled mission.
            debug!(conversation = %envelope.conversation_id, "discarding unmatched reply");
            return;
        };

        if mission.state != MissionState::WaitingReply {
            return;
        }
        let Some(pending) = mission.pending.take() else { return };

        match envelope.performative {
            Performative::Reply => {
                let label = self
                    .request_for(&mission.kind, mission.step_index)
                    .map(|(_, label, _)| label)
                    .unwrap_or("step");
                mission.results.push(StepRecord {
                    agent: pending.agent,
                    label,
                    reply: envelope.content,
                });
                mission.step_index += 1;
                if let Err(e) = self.post_step(mission, now) {
                    mission.state = MissionState::Failed;
                    mission.failure = Some(format!("failed to post next step: {e}"));
                    mission.updated_at = now;
                } else if mission.state == MissionState::Completed {
                    info!(mission = %mission.id, steps = mission.results.len(), "mission completed");
                }
            }
            Performative::Failure => {
                let reason = match &envelope.content {
                    Payload::Failure { code, reason } => format!("{code}: {reason}"),
                    other => format!("unexpected failure payload: {other:?}"),
                };
                warn!(mission = %mission.id, %reason, "mission step failed");
                mission.results.push(StepRecord {
                    agent: pending.agent,
                    label: "failure",
                    reply: envelope.content,
                });
                mission.state = MissionState::Failed;
                mission.failure = Some(reason);
                mission.updated_at = now;
            }
            _ => {
                // Not a terminal answer for this step; restore and wait on.
                mission.pending = Some(pending);
            }
        }
    }

    fn expire_timeouts(&self, now: Timestamp) {
        let mut missions = self.missions.lock();
        for mission in missions.values_mut() {
            if mission.state == MissionState::WaitingReply
                && let Some(pending) = &mission.pending
                && now.seconds_since(pending.sent_at) > self.config.step_timeout_s
            {
                warn!(
                    mission = %mission.id,
                    agent = %pending.agent,
                    step = mission.step_index,
                    "mission step timed out"
                );
                mission.state = MissionState::Failed;
                mission.failure = Some(format!(
                    "timeout waiting for {} on step {}",
                    pending.agent, mission.step_index
                ));
                mission.pending = None;
                mission.updated_at = now;
            }
        }
    }

    /// Drop terminal missions once their retention window lapses.
    fn purge_expired(&self, now: Timestamp) {
        let retention = self.config.mission_retention_s;
        self.missions.lock().retain(|_, m| {
            !(m.state.is_terminal() && now.seconds_since(m.updated_at) > retention)
        });
    }
}

impl Tickable for Orchestrator {
    fn name(&self) -> &AgentId {
        &self.id
    }

    fn tick(&self) -> AgentResult<TickReport> {
        let now = self.clock.now();
        let inbox = self.bus.drain(&self.id)?;
        let drained = inbox.len();

        for envelope in inbox {
            self.handle_envelope(envelope, now);
        }
        self.expire_timeouts(now);
        self.purge_expired(now);

        Ok(TickReport { work_items: drained })
    }
}

// ── Snapshot helpers ──────────────────────────────────────────────────────────

fn snapshot(mission: &Mission) -> MissionSnapshot {
    MissionSnapshot {
        id: mission.id,
        kind: mission.kind.clone(),
        state: mission.state,
        step_index: mission.step_index,
        pending_reply_from: mission.pending.as_ref().map(|p| p.agent.clone()),
        results: mission.results.clone(),
        failure: mission.failure.clone(),
        explanation: explanation(mission),
        created_at: mission.created_at,
        updated_at: mission.updated_at,
    }
}

/// Human-readable outcome for evacuation missions; rule-based because the
/// LLM adapter is an optional external.
fn explanation(mission: &Mission) -> Option<String> {
    if mission.state != MissionState::Completed {
        return None;
    }
    let MissionKind::CoordinatedEvacuation { message, .. } = &mission.kind else {
        return None;
    };
    mission.results.iter().find_map(|r| match &r.reply {
        Payload::EvacuationReply { choice } => Some(format!(
            "In response to \"{}\": evacuate to {} ({:.1} km away, route risk {:.2}).",
            message,
            choice.best.center.name,
            choice.best.route.metrics.total_distance_m / 1_000.0,
            choice.best.route.metrics.average_risk,
        )),
        _ => None,
    })
}
