//! Bounded observation caches.
//!
//! Both caches are owned exclusively by the fusion engine; no other
//! component mutates them.  Capacity overflow evicts least-recently-updated
//! entries (stations) or globally-oldest entries (scout reports).

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use masfro_core::{GeoPoint, GridCell, StationReading, Timestamp};

// ── StationCache ──────────────────────────────────────────────────────────────

struct CachedStation {
    reading: StationReading,
    last_used: u64,
}

/// Latest reading per gauge station, LRU-capped.
pub struct StationCache {
    map: FxHashMap<String, CachedStation>,
    cap: usize,
    tick: u64,
}

impl StationCache {
    pub fn new(cap: usize) -> Self {
        Self { map: FxHashMap::default(), cap: cap.max(1), tick: 0 }
    }

    /// Insert or replace the reading for its station, evicting the
    /// least-recently-updated station on overflow.
    pub fn insert(&mut self, reading: StationReading) {
        self.tick += 1;
        let station = reading.station.clone();
        self.map.insert(station, CachedStation { reading, last_used: self.tick });

        if self.map.len() > self.cap {
            if let Some(oldest) = self
                .map
                .iter()
                .min_by_key(|(_, c)| c.last_used)
                .map(|(name, _)| name.clone())
            {
                self.map.remove(&oldest);
            }
        }
    }

    /// Readings whose TTL has not elapsed at `now`.
    pub fn fresh(&self, now: Timestamp) -> impl Iterator<Item = &StationReading> {
        self.map.values().map(|c| &c.reading).filter(move |r| {
            now.seconds_since(r.observed_at) < r.ttl_seconds as f64
        })
    }

    /// Drop readings whose TTL has elapsed.
    pub fn prune_expired(&mut self, now: Timestamp) {
        self.map.retain(|_, c| {
            now.seconds_since(c.reading.observed_at) < c.reading.ttl_seconds as f64
        });
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

// ── ScoutCache ────────────────────────────────────────────────────────────────

/// A crowd signal normalized for fusion: scout reports, dam spill warnings,
/// and scraped advisories all reduce to this.
#[derive(Clone, Debug, PartialEq)]
pub struct CrowdSignal {
    pub location: GeoPoint,
    pub severity: f32,
    pub confidence: f32,
    pub observed_at: Timestamp,
    pub ttl_seconds: u32,
    seq: u64,
}

impl CrowdSignal {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.seconds_since(self.observed_at) >= self.ttl_seconds as f64
    }
}

/// Recent crowd signals bucketed by grid cell, with a global entry cap.
///
/// Lookup is a 3×3 cell neighborhood scan plus exact haversine filtering —
/// one cell side exceeds the 200 m report radius, so the neighborhood always
/// covers the query disc.
pub struct ScoutCache {
    cells: FxHashMap<GridCell, VecDeque<CrowdSignal>>,
    total: usize,
    cap: usize,
    seq: u64,
}

impl ScoutCache {
    pub fn new(cap: usize) -> Self {
        Self { cells: FxHashMap::default(), total: 0, cap: cap.max(1), seq: 0 }
    }

    pub fn insert(
        &mut self,
        location: GeoPoint,
        severity: f32,
        confidence: f32,
        observed_at: Timestamp,
        ttl_seconds: u32,
    ) {
        self.seq += 1;
        let signal = CrowdSignal {
            location,
            severity,
            confidence,
            observed_at,
            ttl_seconds,
            seq: self.seq,
        };
        self.cells.entry(GridCell::of(location)).or_default().push_back(signal);
        self.total += 1;

        while self.total > self.cap {
            self.evict_oldest();
        }
    }

    /// Non-expired signals within `radius_m` of `p`.
    pub fn signals_near(&self, p: GeoPoint, radius_m: f32, now: Timestamp) -> Vec<&CrowdSignal> {
        let mut hits = Vec::new();
        for cell in GridCell::of(p).neighborhood() {
            if let Some(bucket) = self.cells.get(&cell) {
                for signal in bucket {
                    if !signal.is_expired(now) && p.distance_m(signal.location) <= radius_m {
                        hits.push(signal);
                    }
                }
            }
        }
        hits
    }

    /// Every cell that currently holds at least one signal.
    pub fn occupied_cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.cells
            .iter()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(&cell, _)| cell)
    }

    /// Non-expired signal count.
    pub fn fresh_count(&self, now: Timestamp) -> usize {
        self.cells
            .values()
            .flat_map(|bucket| bucket.iter())
            .filter(|s| !s.is_expired(now))
            .count()
    }

    /// All non-expired signals, for candidate discovery.
    pub fn fresh(&self, now: Timestamp) -> impl Iterator<Item = &CrowdSignal> {
        self.cells
            .values()
            .flat_map(|bucket| bucket.iter())
            .filter(move |s| !s.is_expired(now))
    }

    pub fn prune_expired(&mut self, now: Timestamp) {
        for bucket in self.cells.values_mut() {
            let before = bucket.len();
            bucket.retain(|s| !s.is_expired(now));
            self.total -= before - bucket.len();
        }
        self.cells.retain(|_, bucket| !bucket.is_empty());
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.total = 0;
    }

    /// Remove the signal with the smallest insertion sequence across all
    /// cells.  O(cells); called only on overflow.
    fn evict_oldest(&mut self) {
        let oldest_cell = self
            .cells
            .iter()
            .filter_map(|(&cell, bucket)| bucket.front().map(|s| (cell, s.seq)))
            .min_by_key(|&(_, seq)| seq)
            .map(|(cell, _)| cell);

        if let Some(cell) = oldest_cell {
            if let Some(bucket) = self.cells.get_mut(&cell) {
                bucket.pop_front();
                self.total -= 1;
                if bucket.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        } else {
            // No evictable entry; keep total consistent with reality.
            self.total = self.cells.values().map(VecDeque::len).sum();
        }
    }
}
