//! Message envelopes.
//!
//! Every message carries a performative (speech-act label), sender/receiver
//! ids, a conversation id that replies must echo, and a typed payload.  The
//! payload is a closed sum — there is no stringly-typed content anywhere on
//! the bus.

use uuid::Uuid;

use masfro_core::{
    AgentId, ComputedRoute, EvacuationChoice, FusionSummary, GeoPoint, HazardObservation,
    RawReport, RoutePreferences, Timestamp,
};

// ── ConversationId ────────────────────────────────────────────────────────────

/// Correlates a request with its replies.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConversationId(Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Performative ──────────────────────────────────────────────────────────────

/// Speech-act label of a message.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Performative {
    Request,
    Inform,
    Query,
    Reply,
    Failure,
    Cancel,
}

// ── Recipient ─────────────────────────────────────────────────────────────────

/// Destination of an envelope.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Recipient {
    Agent(AgentId),
    Broadcast,
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// Typed message content, tagged by what it asks for or answers.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    /// A hazard signal for the fusion engine.
    Observation(HazardObservation),
    /// An unclassified crowdsourced report for the scout agent.
    RawReport(RawReport),

    /// Ask the router for a point-to-point route.
    RouteRequest {
        start: GeoPoint,
        end: GeoPoint,
        preferences: RoutePreferences,
    },
    RouteReply {
        route: ComputedRoute,
    },

    /// Ask the router for the best evacuation center.
    EvacuationRequest {
        location: GeoPoint,
        query: Option<String>,
        max_candidates: usize,
        preferences: RoutePreferences,
    },
    EvacuationReply {
        choice: EvacuationChoice,
    },

    /// Ask the scout agent to resolve a place name.
    GeocodeRequest {
        location: String,
    },
    GeocodeReply {
        location: String,
        coordinates: Option<GeoPoint>,
    },

    /// Ask the flood agent to pull its sources now.
    CollectRequest,
    CollectReply {
        observations: usize,
    },

    /// Ask the hazard agent to run a fusion pass now.
    FuseRequest,
    FuseReply {
        summary: FusionSummary,
    },

    /// Cancel a running mission.
    CancelMission {
        mission_id: Uuid,
    },

    /// A step failed; `reason` is operator-readable, `code` is stable.
    Failure {
        code: String,
        reason: String,
    },
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// One message on the bus.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    pub performative: Performative,
    pub sender: AgentId,
    pub receiver: Recipient,
    pub conversation_id: ConversationId,
    pub content: Payload,
    pub sent_at: Timestamp,
}

impl Envelope {
    /// A fresh REQUEST opening a new conversation.
    pub fn request(sender: AgentId, receiver: AgentId, content: Payload, now: Timestamp) -> Self {
        Self {
            performative: Performative::Request,
            sender,
            receiver: Recipient::Agent(receiver),
            conversation_id: ConversationId::new(),
            content,
            sent_at: now,
        }
    }

    /// An INFORM opening a new conversation (one-way data push).
    pub fn inform(sender: AgentId, receiver: AgentId, content: Payload, now: Timestamp) -> Self {
        Self {
            performative: Performative::Inform,
            sender,
            receiver: Recipient::Agent(receiver),
            conversation_id: ConversationId::new(),
            content,
            sent_at: now,
        }
    }

    /// A REPLY echoing the original's conversation id back to its sender.
    pub fn reply_to(original: &Envelope, sender: AgentId, content: Payload, now: Timestamp) -> Self {
        Self {
            performative: Performative::Reply,
            sender,
            receiver: Recipient::Agent(original.sender.clone()),
            conversation_id: original.conversation_id,
            content,
            sent_at: now,
        }
    }

    /// A FAILURE echoing the original's conversation id back to its sender.
    pub fn failure_to(
        original: &Envelope,
        sender: AgentId,
        code: impl Into<String>,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            performative: Performative::Failure,
            sender,
            receiver: Recipient::Agent(original.sender.clone()),
            conversation_id: original.conversation_id,
            content: Payload::Failure { code: code.into(), reason: reason.into() },
            sent_at: now,
        }
    }

    /// A broadcast INFORM to every registered queue.
    pub fn broadcast(sender: AgentId, content: Payload, now: Timestamp) -> Self {
        Self {
            performative: Performative::Inform,
            sender,
            receiver: Recipient::Broadcast,
            conversation_id: ConversationId::new(),
            content,
            sent_at: now,
        }
    }
}
