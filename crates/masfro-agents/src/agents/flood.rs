//! The flood agent: pulls gauge and weather sources, pushes observations to
//! the hazard agent, and records collection history.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use masfro_bus::{Envelope, MessageBus, Payload};
use masfro_core::{
    AgentId, FloodCollection, FloodDataRepository, GeoPoint, HazardObservation, RiverLevelRow,
    SimClock, StationFetcher, Timestamp, WeatherFetcher, WeatherRow,
};

use crate::error::AgentResult;
use crate::fetch::{CircuitBreaker, RetryPolicy};
use crate::tickable::{TickReport, Tickable};

/// Minimum simulated seconds between unsolicited collection runs; an
/// explicit CollectRequest bypasses it.
const COLLECT_INTERVAL_S: f64 = 60.0;

pub struct FloodAgent {
    id: AgentId,
    bus: Arc<MessageBus>,
    clock: Arc<SimClock>,
    stations: Arc<dyn StationFetcher>,
    weather: Option<Arc<dyn WeatherFetcher>>,
    /// Reference point for weather queries (service-area center).
    weather_at: GeoPoint,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    history: Option<Arc<dyn FloodDataRepository>>,
    hazard: AgentId,
    last_collect: Mutex<Option<Timestamp>>,
}

impl FloodAgent {
    pub const NAME: &'static str = "flood";

    pub fn new(
        bus: Arc<MessageBus>,
        stations: Arc<dyn StationFetcher>,
        weather_at: GeoPoint,
        retry: RetryPolicy,
        clock: Arc<SimClock>,
    ) -> Self {
        let breaker = CircuitBreaker::new(5, 120.0, clock.clone());
        Self {
            id: AgentId::from(Self::NAME),
            bus,
            clock,
            stations,
            weather: None,
            weather_at,
            retry,
            breaker,
            history: None,
            hazard: AgentId::from(super::hazard::HazardAgent::NAME),
            last_collect: Mutex::new(None),
        }
    }

    pub fn with_weather(mut self, weather: Arc<dyn WeatherFetcher>) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn FloodDataRepository>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Pull all sources once and forward observations to the hazard agent.
    /// Returns how many observations were sent.
    pub fn collect(&self) -> AgentResult<usize> {
        let now = self.clock.now();
        let readings = self
            .breaker
            .call(|| self.retry.run(|| self.stations.fetch_station_levels()))?;

        let mut collection = FloodCollection::new(now, "gauge-scrape");
        let mut sent = 0usize;

        for reading in readings {
            collection.river_levels.push(RiverLevelRow {
                station: reading.station.clone(),
                level_m: reading.depth_m.unwrap_or(0.0),
                alert_level: None,
            });
            let inform = Envelope::inform(
                self.id.clone(),
                self.hazard.clone(),
                Payload::Observation(HazardObservation::Station(reading)),
                now,
            );
            match self.bus.send(inform) {
                Ok(()) => sent += 1,
                Err(e) => warn!(error = %e, "failed to forward station reading"),
            }
        }

        if let Some(weather) = &self.weather {
            match self.retry.run(|| weather.fetch_weather(self.weather_at)) {
                Ok(snapshot) => collection.weather.push(WeatherRow {
                    location: snapshot.location,
                    rainfall_mm_1h: snapshot.rainfall_mm_1h,
                    temperature_c: snapshot.temperature_c,
                }),
                Err(e) => warn!(error = %e, "weather fetch failed; continuing without it"),
            }
        }

        if let Some(history) = &self.history
            && let Err(e) = history.record_collection(&collection)
        {
            warn!(error = %e, "failed to persist collection history");
        }

        *self.last_collect.lock() = Some(now);
        debug!(observations = sent, "collection run complete");
        Ok(sent)
    }

    fn due_for_collection(&self, now: Timestamp) -> bool {
        match *self.last_collect.lock() {
            None => true,
            Some(last) => now.seconds_since(last) >= COLLECT_INTERVAL_S,
        }
    }
}

impl Tickable for FloodAgent {
    fn name(&self) -> &AgentId {
        &self.id
    }

    fn tick(&self) -> AgentResult<TickReport> {
        let now = self.clock.now();
        let inbox = self.bus.drain(&self.id)?;
        let drained = inbox.len();

        let requests: Vec<Envelope> = inbox
            .into_iter()
            .filter(|e| matches!(e.content, Payload::CollectRequest))
            .collect();

        if !requests.is_empty() || self.due_for_collection(now) {
            match self.collect() {
                Ok(sent) => {
                    for request in requests {
                        let reply = Envelope::reply_to(
                            &request,
                            self.id.clone(),
                            Payload::CollectReply { observations: sent },
                            now,
                        );
                        if let Err(e) = self.bus.send(reply) {
                            warn!(error = %e, "failed to deliver collection reply");
                        }
                    }
                }
                Err(e) => {
                    // Requesters get a typed failure instead of a timeout.
                    for request in &requests {
                        let failure = Envelope::failure_to(
                            request,
                            self.id.clone(),
                            "COLLECTION_FAILED",
                            e.to_string(),
                            now,
                        );
                        if let Err(send_err) = self.bus.send(failure) {
                            warn!(error = %send_err, "failed to deliver collection failure");
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(TickReport { work_items: drained })
    }

    /// The agent is healthy while its primary source circuit is not open.
    fn healthy(&self) -> bool {
        self.breaker.state() != crate::fetch::CircuitState::Open
    }
}
