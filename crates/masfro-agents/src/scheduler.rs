//! The agent lifecycle scheduler.
//!
//! Solves the dormant-agent problem: agents expose `tick()` but nothing
//! would call it.  The scheduler runs a cadence loop (default 1 Hz) that
//! ticks every registered agent in ascending priority order, pausing
//! entirely while a simulation is active — the simulation's own phase order
//! drives agents then.
//!
//! An agent whose last N ticks all failed is isolated (its ticks are
//! skipped) until its health probe reports OK again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{error, info, warn};

use masfro_core::{AgentId, SchedulerConfig};

use crate::tickable::Tickable;

// ── SimGate ───────────────────────────────────────────────────────────────────

/// Shared flag coordinating scheduler cadence with simulation exclusivity.
///
/// The simulation manager holds one clone and raises it for the duration of
/// a scenario; the scheduler checks it at every cadence edge.
#[derive(Clone, Default)]
pub struct SimGate(Arc<AtomicBool>);

impl SimGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn deactivate(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Per-agent bookkeeping ─────────────────────────────────────────────────────

/// Rolling tick counters for one agent.
#[derive(Clone, Debug, Default)]
pub struct TickStats {
    pub ticks_total: u64,
    pub ticks_errors: u64,
    pub last_tick_duration_ms: f64,
    pub last_error: Option<String>,
}

/// Status row exposed by [`AgentScheduler::status`].
#[derive(Clone, Debug)]
pub struct AgentStatus {
    pub name: AgentId,
    pub priority: i32,
    pub isolated: bool,
    pub stats: TickStats,
}

struct Registered {
    agent: Arc<dyn Tickable>,
    priority: i32,
    /// Serializes this agent's ticks; cross-agent ticks may run in parallel.
    tick_lock: Mutex<()>,
    stats: Mutex<TickStats>,
    consecutive_failures: AtomicU32,
    isolated: AtomicBool,
}

// ── AgentScheduler ────────────────────────────────────────────────────────────

struct SchedulerInner {
    config: SchedulerConfig,
    gate: SimGate,
    agents: RwLock<Vec<Arc<Registered>>>,
    running: AtomicBool,
    skipped_for_simulation: AtomicU64,
    handle: Mutex<Option<std::thread::JoinHandle<()>>>,
}

/// Drives registered agents at a fixed cadence.
///
/// Cheap to clone; all clones share the same registry and loop.
#[derive(Clone)]
pub struct AgentScheduler {
    inner: Arc<SchedulerInner>,
}

impl AgentScheduler {
    pub fn new(config: SchedulerConfig, gate: SimGate) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                gate,
                agents: RwLock::new(Vec::new()),
                running: AtomicBool::new(false),
                skipped_for_simulation: AtomicU64::new(0),
                handle: Mutex::new(None),
            }),
        }
    }

    /// Register an agent.  Lower priority ticks first.
    pub fn register(&self, agent: Arc<dyn Tickable>, priority: i32) {
        info!(agent = %agent.name(), priority, "agent registered with scheduler");
        let mut agents = self.inner.agents.write();
        agents.push(Arc::new(Registered {
            agent,
            priority,
            tick_lock: Mutex::new(()),
            stats: Mutex::new(TickStats::default()),
            consecutive_failures: AtomicU32::new(0),
            isolated: AtomicBool::new(false),
        }));
        agents.sort_by_key(|r| r.priority);
    }

    // ── Cadence loop ──────────────────────────────────────────────────────

    /// Start the background cadence thread.  No-op when already running or
    /// when the configuration disables the scheduler.
    pub fn start(&self) {
        if self.inner.config.disabled {
            warn!("scheduler disabled by configuration; agents will not tick");
            return;
        }
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let interval = Duration::from_millis(self.inner.config.tick_interval_ms);
        let scheduler = self.clone();
        let handle = std::thread::Builder::new()
            .name("agent-scheduler".into())
            .spawn(move || {
                while scheduler.inner.running.load(Ordering::SeqCst) {
                    scheduler.run_cycle();
                    std::thread::sleep(interval);
                }
            });
        match handle {
            Ok(handle) => {
                *self.inner.handle.lock() = Some(handle);
                info!(interval_ms = self.inner.config.tick_interval_ms, "scheduler started");
            }
            Err(e) => {
                self.inner.running.store(false, Ordering::SeqCst);
                error!(error = %e, "failed to spawn scheduler thread");
            }
        }
    }

    /// Stop the cadence thread, waiting for the in-flight cycle to finish.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.inner.handle.lock().take() {
            let _ = handle.join();
        }
        info!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Tick all registered agents once, in ascending priority order.
    ///
    /// Skipped entirely while the simulation gate is raised.  Returns the
    /// number of agents actually ticked.  Exposed for tests and the
    /// out-of-band admin trigger.
    pub fn run_cycle(&self) -> usize {
        if self.inner.gate.is_active() {
            self.inner.skipped_for_simulation.fetch_add(1, Ordering::Relaxed);
            return 0;
        }

        let agents: Vec<Arc<Registered>> = self.inner.agents.read().clone();

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            agents
                .par_iter()
                .map(|r| usize::from(self.tick_one(r)))
                .sum()
        }

        #[cfg(not(feature = "parallel"))]
        {
            agents.iter().map(|r| usize::from(self.tick_one(r))).sum()
        }
    }

    /// Cadence edges skipped because a simulation was running.
    pub fn skipped_for_simulation(&self) -> u64 {
        self.inner.skipped_for_simulation.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> Vec<AgentStatus> {
        self.inner
            .agents
            .read()
            .iter()
            .map(|r| AgentStatus {
                name: r.agent.name().clone(),
                priority: r.priority,
                isolated: r.isolated.load(Ordering::SeqCst),
                stats: r.stats.lock().clone(),
            })
            .collect()
    }

    // ── One agent, one tick ───────────────────────────────────────────────

    fn tick_one(&self, registered: &Registered) -> bool {
        // Isolated agents stay skipped until their health probe clears.
        if registered.isolated.load(Ordering::SeqCst) {
            if registered.agent.healthy() {
                registered.isolated.store(false, Ordering::SeqCst);
                registered.consecutive_failures.store(0, Ordering::SeqCst);
                info!(agent = %registered.agent.name(), "agent re-admitted after health check");
            } else {
                return false;
            }
        }

        let _serialized = registered.tick_lock.lock();
        let started = Instant::now();
        let outcome = registered.agent.tick();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;

        let mut stats = registered.stats.lock();
        stats.ticks_total += 1;
        stats.last_tick_duration_ms = elapsed_ms;

        match outcome {
            Ok(_) => {
                registered.consecutive_failures.store(0, Ordering::SeqCst);
                stats.last_error = None;
            }
            Err(e) => {
                stats.ticks_errors += 1;
                stats.last_error = Some(e.to_string());
                let failures = registered.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                error!(agent = %registered.agent.name(), error = %e, failures, "agent tick failed");

                if failures >= self.inner.config.isolation_threshold {
                    registered.isolated.store(true, Ordering::SeqCst);
                    warn!(
                        agent = %registered.agent.name(),
                        failures,
                        "agent isolated until health check passes"
                    );
                }
            }
        }
        true
    }
}
