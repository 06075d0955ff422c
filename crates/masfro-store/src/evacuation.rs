//! Evacuation-center repositories.
//!
//! Occupancy mutation lives here, not in the core: both implementations own
//! the `[0, capacity]` clamp and the audit trail behind `reason`.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rusqlite::Connection;
use tracing::info;

use masfro_core::{
    EvacuationCenter, EvacuationRepository, GeoPoint, OccupancyStatistics, RepositoryError,
    SimClock, Timestamp,
};

use crate::storage_err;

// ── In-memory implementation ──────────────────────────────────────────────────

/// Test/demo repository holding centers in a `RwLock`ed vector.
pub struct MemoryEvacuationRepository {
    centers: RwLock<Vec<EvacuationCenter>>,
    clock: Arc<SimClock>,
}

impl MemoryEvacuationRepository {
    pub fn new(centers: Vec<EvacuationCenter>, clock: Arc<SimClock>) -> Self {
        Self { centers: RwLock::new(centers), clock }
    }
}

impl EvacuationRepository for MemoryEvacuationRepository {
    fn get_all(&self) -> Result<Vec<EvacuationCenter>, RepositoryError> {
        Ok(self.centers.read().clone())
    }

    fn get_by_name(&self, name: &str) -> Result<Option<EvacuationCenter>, RepositoryError> {
        Ok(self.centers.read().iter().find(|c| c.name == name).cloned())
    }

    fn update_occupancy(
        &self,
        name: &str,
        occupancy: u32,
        _reason: &str,
    ) -> Result<(), RepositoryError> {
        let mut centers = self.centers.write();
        let center = centers
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| RepositoryError::NotFound(name.to_owned()))?;
        if occupancy > center.capacity {
            return Err(RepositoryError::CapacityExceeded {
                name: name.to_owned(),
                requested: occupancy,
                capacity: center.capacity,
            });
        }
        center.current_occupancy = occupancy;
        center.updated_at = self.clock.now();
        Ok(())
    }

    fn add_evacuees(&self, name: &str, count: u32) -> Result<u32, RepositoryError> {
        let mut centers = self.centers.write();
        let center = centers
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| RepositoryError::NotFound(name.to_owned()))?;
        let requested = center.current_occupancy + count;
        if requested > center.capacity {
            return Err(RepositoryError::CapacityExceeded {
                name: name.to_owned(),
                requested,
                capacity: center.capacity,
            });
        }
        center.current_occupancy = requested;
        center.updated_at = self.clock.now();
        Ok(requested)
    }

    fn reset_all(&self) -> Result<(), RepositoryError> {
        let now = self.clock.now();
        for center in self.centers.write().iter_mut() {
            center.current_occupancy = 0;
            center.updated_at = now;
        }
        Ok(())
    }

    fn statistics(&self) -> Result<OccupancyStatistics, RepositoryError> {
        let centers = self.centers.read();
        let active: Vec<_> = centers.iter().filter(|c| c.is_active).collect();
        Ok(OccupancyStatistics {
            active_centers: active.len(),
            full_centers: active.iter().filter(|c| !c.has_space()).count(),
            total_capacity: active.iter().map(|c| c.capacity as u64).sum(),
            total_occupancy: active.iter().map(|c| c.current_occupancy as u64).sum(),
        })
    }
}

// ── SQLite implementation ─────────────────────────────────────────────────────

/// Production repository: one SQLite file, occupancy changes audited into
/// `occupancy_log`.
pub struct SqliteEvacuationRepository {
    conn: Mutex<Connection>,
    clock: Arc<SimClock>,
}

impl SqliteEvacuationRepository {
    /// Open (or create) the database at `path` and initialise the schema.
    pub fn open(path: &Path, clock: Arc<SimClock>) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::with_connection(conn, clock)
    }

    /// Fully in-memory database, for tests.
    pub fn in_memory(clock: Arc<SimClock>) -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::with_connection(conn, clock)
    }

    fn with_connection(conn: Connection, clock: Arc<SimClock>) -> Result<Self, RepositoryError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS evacuation_centers (
                 id                INTEGER PRIMARY KEY AUTOINCREMENT,
                 name              TEXT NOT NULL UNIQUE,
                 lat               REAL NOT NULL,
                 lon               REAL NOT NULL,
                 capacity          INTEGER NOT NULL,
                 current_occupancy INTEGER NOT NULL DEFAULT 0,
                 center_type       TEXT NOT NULL DEFAULT '',
                 barangay          TEXT NOT NULL DEFAULT '',
                 contact           TEXT,
                 facilities        TEXT NOT NULL DEFAULT '',
                 is_active         INTEGER NOT NULL DEFAULT 1,
                 updated_at        REAL NOT NULL
             );
             CREATE TABLE IF NOT EXISTS occupancy_log (
                 id          INTEGER PRIMARY KEY AUTOINCREMENT,
                 center_name TEXT NOT NULL,
                 occupancy   INTEGER NOT NULL,
                 reason      TEXT NOT NULL,
                 logged_at   REAL NOT NULL
             );",
        )
        .map_err(storage_err)?;
        Ok(Self { conn: Mutex::new(conn), clock })
    }

    /// Insert or replace one center (seeding and admin edits).
    pub fn upsert_center(&self, center: &EvacuationCenter) -> Result<(), RepositoryError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO evacuation_centers \
             (name, lat, lon, capacity, current_occupancy, center_type, barangay, contact, \
              facilities, is_active, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             ON CONFLICT(name) DO UPDATE SET \
               lat = ?2, lon = ?3, capacity = ?4, current_occupancy = ?5, center_type = ?6, \
               barangay = ?7, contact = ?8, facilities = ?9, is_active = ?10, updated_at = ?11",
            rusqlite::params![
                center.name,
                center.location.lat as f64,
                center.location.lon as f64,
                center.capacity,
                center.current_occupancy,
                center.center_type,
                center.barangay,
                center.contact,
                center.facilities.join(";"),
                center.is_active as i64,
                center.updated_at.0,
            ],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn row_to_center(row: &rusqlite::Row<'_>) -> rusqlite::Result<EvacuationCenter> {
        let facilities: String = row.get("facilities")?;
        Ok(EvacuationCenter {
            id: row.get("id")?,
            name: row.get("name")?,
            location: GeoPoint::new(
                row.get::<_, f64>("lat")? as f32,
                row.get::<_, f64>("lon")? as f32,
            ),
            capacity: row.get("capacity")?,
            current_occupancy: row.get("current_occupancy")?,
            center_type: row.get("center_type")?,
            barangay: row.get("barangay")?,
            contact: row.get("contact")?,
            facilities: if facilities.is_empty() {
                Vec::new()
            } else {
                facilities.split(';').map(str::to_owned).collect()
            },
            is_active: row.get::<_, i64>("is_active")? != 0,
            updated_at: Timestamp(row.get("updated_at")?),
        })
    }

    fn capacity_of(conn: &Connection, name: &str) -> Result<(u32, u32), RepositoryError> {
        conn.query_row(
            "SELECT capacity, current_occupancy FROM evacuation_centers WHERE name = ?1",
            [name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound(name.to_owned()),
            other => storage_err(other),
        })
    }

    fn write_occupancy(
        &self,
        conn: &Connection,
        name: &str,
        occupancy: u32,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        let now = self.clock.now().0;
        conn.execute(
            "UPDATE evacuation_centers SET current_occupancy = ?1, updated_at = ?2 WHERE name = ?3",
            rusqlite::params![occupancy, now, name],
        )
        .map_err(storage_err)?;
        conn.execute(
            "INSERT INTO occupancy_log (center_name, occupancy, reason, logged_at) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![name, occupancy, reason, now],
        )
        .map_err(storage_err)?;
        Ok(())
    }
}

impl EvacuationRepository for SqliteEvacuationRepository {
    fn get_all(&self) -> Result<Vec<EvacuationCenter>, RepositoryError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM evacuation_centers ORDER BY name")
            .map_err(storage_err)?;
        let centers = stmt
            .query_map([], Self::row_to_center)
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)?;
        Ok(centers)
    }

    fn get_by_name(&self, name: &str) -> Result<Option<EvacuationCenter>, RepositoryError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM evacuation_centers WHERE name = ?1")
            .map_err(storage_err)?;
        match stmt.query_row([name], Self::row_to_center) {
            Ok(center) => Ok(Some(center)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    fn update_occupancy(
        &self,
        name: &str,
        occupancy: u32,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        let conn = self.conn.lock();
        let (capacity, _) = Self::capacity_of(&conn, name)?;
        if occupancy > capacity {
            return Err(RepositoryError::CapacityExceeded {
                name: name.to_owned(),
                requested: occupancy,
                capacity,
            });
        }
        self.write_occupancy(&conn, name, occupancy, reason)
    }

    fn add_evacuees(&self, name: &str, count: u32) -> Result<u32, RepositoryError> {
        let conn = self.conn.lock();
        let (capacity, current) = Self::capacity_of(&conn, name)?;
        let requested = current + count;
        if requested > capacity {
            return Err(RepositoryError::CapacityExceeded {
                name: name.to_owned(),
                requested,
                capacity,
            });
        }
        self.write_occupancy(&conn, name, requested, "evacuees admitted")?;
        Ok(requested)
    }

    fn reset_all(&self) -> Result<(), RepositoryError> {
        let conn = self.conn.lock();
        let now = self.clock.now().0;
        conn.execute(
            "UPDATE evacuation_centers SET current_occupancy = 0, updated_at = ?1",
            [now],
        )
        .map_err(storage_err)?;
        info!("all evacuation-center occupancy reset");
        Ok(())
    }

    fn statistics(&self) -> Result<OccupancyStatistics, RepositoryError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(current_occupancy >= capacity), 0),
                    COALESCE(SUM(capacity), 0),
                    COALESCE(SUM(current_occupancy), 0)
             FROM evacuation_centers WHERE is_active = 1",
            [],
            |row| {
                Ok(OccupancyStatistics {
                    active_centers: row.get::<_, i64>(0)? as usize,
                    full_centers: row.get::<_, i64>(1)? as usize,
                    total_capacity: row.get::<_, i64>(2)? as u64,
                    total_occupancy: row.get::<_, i64>(3)? as u64,
                })
            },
        )
        .map_err(storage_err)
    }
}
