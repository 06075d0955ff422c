//! The `SimulationManager`.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{info, warn};

use masfro_agents::{HazardAgent, SimGate};
use masfro_bus::{Envelope, MessageBus, Payload};
use masfro_core::{
    AgentId, ComputedRoute, FusionSummary, GeoPoint, HazardObservation, ReportType,
    ReturnPeriod, RoutePreferences, ScoutClassification, ScoutReport, SimClock, StationReading,
    Timestamp,
};
use masfro_fusion::RasterProvider;
use masfro_graph::GraphStore;
use masfro_routing::RoutingEngine;

use crate::error::{SimError, SimResult};
use crate::scenario::ScenarioRasterProvider;
use crate::MAX_TIME_STEP;

// ── Public DTOs ───────────────────────────────────────────────────────────────

/// Scenario intensity preset.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SimulationMode {
    Light,
    Medium,
    Heavy,
}

impl SimulationMode {
    pub fn return_period(self) -> ReturnPeriod {
        match self {
            SimulationMode::Light => ReturnPeriod::Rr01,
            SimulationMode::Medium => ReturnPeriod::Rr02,
            SimulationMode::Heavy => ReturnPeriod::Rr03,
        }
    }
}

/// A route request parked until the next tick's routing phase.
#[derive(Clone, Debug)]
pub struct QueuedRouteRequest {
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub preferences: RoutePreferences,
}

/// Outcome of one `run_tick`.
#[derive(Clone, Debug)]
pub struct TickSummary {
    pub time_step: u8,
    pub observations_emitted: usize,
    pub fusion: FusionSummary,
    pub routes_answered: usize,
    pub routes_failed: usize,
    pub routes: Vec<Result<ComputedRoute, String>>,
}

/// Counters accumulated across a simulation run.
#[derive(Clone, Debug, Default)]
pub struct SimulationStats {
    pub ticks_run: u64,
    pub observations_emitted: u64,
    pub routes_answered: u64,
    pub routes_failed: u64,
    pub last_fusion: Option<FusionSummary>,
}

#[derive(Clone, Debug)]
pub struct SimulationStatus {
    pub running: bool,
    pub mode: Option<SimulationMode>,
    pub time_step: u8,
    pub queued_requests: usize,
    pub stats: SimulationStats,
}

// ── Manager ───────────────────────────────────────────────────────────────────

struct SimState {
    running: bool,
    in_tick: bool,
    mode: Option<SimulationMode>,
    time_step: u8,
}

/// Deterministic tick-based scenario driver.
///
/// While running it holds the [`SimGate`] up, so the cadence scheduler skips
/// its cycles and the three-phase tick below is the only thing driving
/// agents.
pub struct SimulationManager {
    gate: SimGate,
    clock: Arc<SimClock>,
    bus: Arc<MessageBus>,
    graph: Arc<GraphStore>,
    hazard: Arc<HazardAgent>,
    engine: Arc<RoutingEngine>,
    raster: Arc<ScenarioRasterProvider>,
    /// Synthetic gauge sites sampled during the collection phase.
    stations: Vec<(String, GeoPoint)>,
    sender: AgentId,
    hazard_queue: AgentId,
    state: Mutex<SimState>,
    tick_done: Condvar,
    queue: Mutex<VecDeque<QueuedRouteRequest>>,
    stats: Mutex<SimulationStats>,
}

impl SimulationManager {
    pub fn new(
        gate: SimGate,
        bus: Arc<MessageBus>,
        graph: Arc<GraphStore>,
        hazard: Arc<HazardAgent>,
        engine: Arc<RoutingEngine>,
        raster: Arc<ScenarioRasterProvider>,
        stations: Vec<(String, GeoPoint)>,
        clock: Arc<SimClock>,
    ) -> Self {
        Self {
            gate,
            clock,
            bus,
            graph,
            hazard,
            engine,
            raster,
            stations,
            sender: AgentId::from("simulation"),
            hazard_queue: AgentId::from(HazardAgent::NAME),
            state: Mutex::new(SimState {
                running: false,
                in_tick: false,
                mode: None,
                time_step: 0,
            }),
            tick_done: Condvar::new(),
            queue: Mutex::new(VecDeque::new()),
            stats: Mutex::new(SimulationStats::default()),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Begin a scenario at time step 1.  The scheduler yields until `stop`.
    pub fn start(&self, mode: SimulationMode) -> SimResult<()> {
        let mut state = self.state.lock();
        if state.running {
            return Err(SimError::AlreadyRunning);
        }
        state.running = true;
        state.mode = Some(mode);
        state.time_step = 1;
        drop(state);

        self.gate.activate();
        self.hazard
            .fusion()
            .lock()
            .set_scenario(mode.return_period(), 1);
        info!(?mode, period = %mode.return_period(), "simulation started");
        Ok(())
    }

    /// Stop the scenario.  Idempotent; waits for an in-flight tick.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        while state.in_tick {
            self.tick_done.wait(&mut state);
        }
        if !state.running {
            return;
        }
        state.running = false;
        state.mode = None;
        drop(state);

        self.gate.deactivate();
        self.hazard.fusion().lock().clear_scenario();
        info!("simulation stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Park a route request for the next tick's routing phase.
    pub fn add_route_request(&self, request: QueuedRouteRequest) {
        self.queue.lock().push_back(request);
    }

    /// Return to the pre-simulation state: time step 0, queues empty, all
    /// edge risk zeroed, fusion caches cleared.  Statistics survive only
    /// when `preserve_stats` is set.
    pub fn reset(&self, preserve_stats: bool) {
        let mut state = self.state.lock();
        while state.in_tick {
            self.tick_done.wait(&mut state);
        }
        state.running = false;
        state.mode = None;
        state.time_step = 0;
        drop(state);

        self.gate.deactivate();
        self.queue.lock().clear();
        if !preserve_stats {
            *self.stats.lock() = SimulationStats::default();
        }
        {
            let mut fusion = self.hazard.fusion().lock();
            fusion.clear_scenario();
            fusion.clear_caches();
        }
        self.graph.reset_risks(self.clock.now());
        info!(preserve_stats, "simulation reset");
    }

    pub fn status(&self) -> SimulationStatus {
        let state = self.state.lock();
        SimulationStatus {
            running: state.running,
            mode: state.mode,
            time_step: state.time_step,
            queued_requests: self.queue.lock().len(),
            stats: self.stats.lock().clone(),
        }
    }

    // ── The tick ──────────────────────────────────────────────────────────

    /// Run one tick: collection → fusion → routing, then advance the time
    /// step (clamped at 18, where the final raster keeps applying).
    ///
    /// `jump` moves directly to a specific time step first.
    pub fn run_tick(&self, jump: Option<u8>) -> SimResult<TickSummary> {
        let (mode, time_step) = {
            let mut state = self.state.lock();
            if !state.running {
                return Err(SimError::NotRunning);
            }
            if state.in_tick {
                return Err(SimError::TickInProgress);
            }
            if let Some(step) = jump {
                if !(1..=MAX_TIME_STEP).contains(&step) {
                    return Err(SimError::BadTimeStep(step));
                }
                state.time_step = step;
            }
            let mode = state.mode.ok_or(SimError::NotRunning)?;
            state.in_tick = true;
            (mode, state.time_step)
        };

        // Align the fusion engine's raster scenario with this tick's step
        // (a jump would otherwise leave it on the previous snapshot).
        self.hazard
            .fusion()
            .lock()
            .set_scenario(mode.return_period(), time_step);

        let outcome = self.tick_phases(mode, time_step);

        // Advance and release the tick flag even on error.
        let mut state = self.state.lock();
        state.in_tick = false;
        if outcome.is_ok() {
            state.time_step = (time_step + 1).min(MAX_TIME_STEP);
        }
        drop(state);
        self.tick_done.notify_all();
        outcome
    }

    fn tick_phases(&self, mode: SimulationMode, time_step: u8) -> SimResult<TickSummary> {
        let now = self.clock.now();
        let period = mode.return_period();

        // ── Phase 1: collection ───────────────────────────────────────────
        let observations_emitted = self.emit_synthetic_observations(period, time_step, now);

        // ── Phase 2: fusion (exactly one batch) ───────────────────────────
        let (_, fusion) = self.hazard.drain_and_fuse()?;

        // ── Phase 3: routing ──────────────────────────────────────────────
        let parked: Vec<QueuedRouteRequest> = self.queue.lock().drain(..).collect();
        let mut routes = Vec::with_capacity(parked.len());
        let mut answered = 0usize;
        let mut failed = 0usize;
        for request in parked {
            match self
                .engine
                .compute_route(request.start, request.end, &request.preferences)
            {
                Ok(route) => {
                    answered += 1;
                    routes.push(Ok(route));
                }
                Err(e) => {
                    failed += 1;
                    routes.push(Err(e.to_string()));
                }
            }
        }

        let mut stats = self.stats.lock();
        stats.ticks_run += 1;
        stats.observations_emitted += observations_emitted as u64;
        stats.routes_answered += answered as u64;
        stats.routes_failed += failed as u64;
        stats.last_fusion = Some(fusion.clone());
        drop(stats);

        info!(
            time_step,
            observations_emitted,
            edges_updated = fusion.edges_updated,
            routes_answered = answered,
            "simulation tick complete"
        );

        Ok(TickSummary {
            time_step,
            observations_emitted,
            fusion,
            routes_answered: answered,
            routes_failed: failed,
            routes,
        })
    }

    /// Phase 1: sample the scenario field at each synthetic gauge site and
    /// push the readings (plus crowd confirmations of deep water) into the
    /// hazard inbox.
    fn emit_synthetic_observations(
        &self,
        period: ReturnPeriod,
        time_step: u8,
        now: Timestamp,
    ) -> usize {
        let mut emitted = 0usize;

        for (name, location) in &self.stations {
            let depth = match self.raster.depth_at(period, time_step, *location) {
                Ok(d) => d.unwrap_or(0.0),
                Err(e) => {
                    warn!(station = name.as_str(), error = %e, "synthetic raster sample failed");
                    continue;
                }
            };

            let reading = HazardObservation::Station(StationReading {
                station: name.clone(),
                location: *location,
                depth_m: Some(depth),
                rainfall_mm_1h: None,
                confidence: 0.9,
                observed_at: now,
                ttl_seconds: 3_600,
            });
            if self.push_to_hazard(reading, now) {
                emitted += 1;
            }

            // Deep water also produces a crowd report, mirroring how field
            // reports trail gauge spikes during real events.
            if depth > 0.3 {
                let report = HazardObservation::Scout(ScoutReport {
                    location: *location,
                    text: None,
                    image_ref: None,
                    classification: ScoutClassification {
                        is_flood_related: true,
                        report_type: ReportType::Flooding,
                        severity: masfro_risk::depth_to_risk(depth),
                        confidence: 0.8,
                    },
                    observed_at: now,
                    ttl_seconds: 3_600,
                });
                if self.push_to_hazard(report, now) {
                    emitted += 1;
                }
            }
        }
        emitted
    }

    fn push_to_hazard(&self, observation: HazardObservation, now: Timestamp) -> bool {
        let envelope = Envelope::inform(
            self.sender.clone(),
            self.hazard_queue.clone(),
            Payload::Observation(observation),
            now,
        );
        match self.bus.send(envelope) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to enqueue synthetic observation");
                false
            }
        }
    }
}
