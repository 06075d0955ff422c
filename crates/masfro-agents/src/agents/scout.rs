//! The scout agent: classifies raw crowdsourced reports and geocodes place
//! names.
//!
//! The LLM and vision adapters are external; when absent (always, in the
//! core) classification is rule-based keyword matching and geocoding uses a
//! preloaded gazetteer.  Both are deterministic.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use masfro_bus::{Envelope, MessageBus, Payload};
use masfro_core::{
    AgentId, GeoPoint, HazardObservation, RawReport, ReportType, ScoutClassification,
    ScoutReport, SimClock, DEFAULT_TTL_SECONDS,
};

use crate::error::AgentResult;
use crate::tickable::{TickReport, Tickable};

// ── RuleClassifier ────────────────────────────────────────────────────────────

/// Keyword-rule report classifier (English and Filipino terms).
#[derive(Default)]
pub struct RuleClassifier;

/// Keyword table: (term, report type, base severity).
const KEYWORDS: &[(&str, ReportType, f32)] = &[
    ("flood", ReportType::Flooding, 0.6),
    ("baha", ReportType::Flooding, 0.6),
    ("submerged", ReportType::Flooding, 0.7),
    ("underwater", ReportType::Flooding, 0.7),
    ("tubig", ReportType::Flooding, 0.5),
    ("blocked", ReportType::Blocked, 0.7),
    ("impassable", ReportType::Blocked, 0.8),
    ("sarado", ReportType::Blocked, 0.7),
    ("traffic", ReportType::Traffic, 0.3),
    ("gridlock", ReportType::Traffic, 0.4),
    ("landslide", ReportType::Hazard, 0.7),
    ("debris", ReportType::Hazard, 0.5),
    ("evacuate", ReportType::Evacuation, 0.6),
    ("lumikas", ReportType::Evacuation, 0.6),
    ("clear", ReportType::Clear, 0.0),
    ("passable", ReportType::Clear, 0.0),
    ("dry", ReportType::Clear, 0.0),
];

/// Severity intensifiers for flood depth phrasing.
const INTENSIFIERS: &[(&str, f32)] = &[
    ("ankle", 0.0),
    ("knee", 0.1),
    ("waist", 0.25),
    ("chest", 0.35),
    ("deep", 0.2),
    ("malalim", 0.2),
    ("rising", 0.1),
];

impl RuleClassifier {
    /// Classify free text into a report type, severity, and confidence.
    ///
    /// Confidence grows with the number of matched terms; text matching
    /// nothing is classified as not flood related.
    pub fn classify(&self, text: &str) -> ScoutClassification {
        let lower = text.to_lowercase();

        let mut matches = 0u32;
        let mut best: Option<(ReportType, f32)> = None;
        for &(term, report_type, severity) in KEYWORDS {
            if lower.contains(term) {
                matches += 1;
                // The most severe match wins; Clear only sticks when nothing
                // hazardous matched alongside it.
                let replace = match best {
                    None => true,
                    Some((_, s)) => severity > s,
                };
                if replace {
                    best = Some((report_type, severity));
                }
            }
        }

        let Some((report_type, mut severity)) = best else {
            return ScoutClassification {
                is_flood_related: false,
                report_type: ReportType::Clear,
                severity: 0.0,
                confidence: 0.3,
            };
        };

        if report_type == ReportType::Flooding {
            for &(term, boost) in INTENSIFIERS {
                if lower.contains(term) {
                    severity += boost;
                }
            }
        }

        ScoutClassification {
            is_flood_related: true,
            report_type,
            severity: severity.clamp(0.0, 1.0),
            confidence: (0.5 + 0.1 * matches as f32).min(0.9),
        }
    }
}

// ── Gazetteer ─────────────────────────────────────────────────────────────────

/// Preloaded place-name → coordinate lookup.
pub struct Gazetteer {
    entries: FxHashMap<String, GeoPoint>,
}

impl Gazetteer {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, f32, f32)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, lat, lon)| (name.to_lowercase(), GeoPoint::new(lat, lon)))
                .collect(),
        }
    }

    /// Resolve a place reference: exact match first, then the longest entry
    /// name contained in the query.
    pub fn lookup(&self, query: &str) -> Option<GeoPoint> {
        let normalized = query.trim().to_lowercase();
        if let Some(&point) = self.entries.get(&normalized) {
            return Some(point);
        }
        self.entries
            .iter()
            .filter(|(name, _)| normalized.contains(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, &point)| point)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── ScoutAgent ────────────────────────────────────────────────────────────────

pub struct ScoutAgent {
    id: AgentId,
    bus: Arc<MessageBus>,
    clock: Arc<SimClock>,
    classifier: RuleClassifier,
    gazetteer: Gazetteer,
    /// Where classified reports go.
    hazard: AgentId,
}

impl ScoutAgent {
    pub const NAME: &'static str = "scout";

    pub fn new(bus: Arc<MessageBus>, gazetteer: Gazetteer, clock: Arc<SimClock>) -> Self {
        Self {
            id: AgentId::from(Self::NAME),
            bus,
            clock,
            classifier: RuleClassifier,
            gazetteer,
            hazard: AgentId::from(super::hazard::HazardAgent::NAME),
        }
    }

    pub fn classifier(&self) -> &RuleClassifier {
        &self.classifier
    }

    /// Turn a raw report into a scout observation, locating it from its own
    /// coordinates or, failing that, from place names in the text.
    fn process_report(&self, raw: RawReport) -> Option<HazardObservation> {
        let classification = self.classifier.classify(&raw.text);
        let location = raw.location.or_else(|| self.gazetteer.lookup(&raw.text))?;

        Some(HazardObservation::Scout(ScoutReport {
            location,
            text: Some(raw.text),
            image_ref: raw.image_ref,
            classification,
            observed_at: raw.posted_at,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }))
    }
}

impl Tickable for ScoutAgent {
    fn name(&self) -> &AgentId {
        &self.id
    }

    fn tick(&self) -> AgentResult<TickReport> {
        let now = self.clock.now();
        let inbox = self.bus.drain(&self.id)?;
        let drained = inbox.len();

        for envelope in inbox {
            match envelope.content {
                Payload::RawReport(ref raw) => match self.process_report(raw.clone()) {
                    Some(observation) => {
                        let inform = Envelope::inform(
                            self.id.clone(),
                            self.hazard.clone(),
                            Payload::Observation(observation),
                            now,
                        );
                        if let Err(e) = self.bus.send(inform) {
                            warn!(error = %e, "failed to forward classified report");
                        }
                    }
                    None => {
                        debug!(text = %raw.text, "report dropped: no resolvable location");
                    }
                },

                Payload::GeocodeRequest { ref location } => {
                    let coordinates = self.gazetteer.lookup(location);
                    let reply = Envelope::reply_to(
                        &envelope,
                        self.id.clone(),
                        Payload::GeocodeReply { location: location.clone(), coordinates },
                        now,
                    );
                    if let Err(e) = self.bus.send(reply) {
                        warn!(error = %e, "failed to deliver geocode reply");
                    }
                }

                ref other => {
                    warn!(content = ?other, "scout agent ignoring unexpected payload");
                }
            }
        }

        Ok(TickReport { work_items: drained })
    }
}
