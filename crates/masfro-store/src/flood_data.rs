//! Collection-history repository.
//!
//! One collection = one header row plus child rows for river levels and
//! weather readings, written in a single transaction.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;
use uuid::Uuid;

use masfro_core::{
    FloodCollection, FloodDataRepository, GeoPoint, RepositoryError, RiverLevelRow, Timestamp,
    WeatherRow,
};

use crate::storage_err;

pub struct SqliteFloodDataRepository {
    conn: Mutex<Connection>,
}

impl SqliteFloodDataRepository {
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS flood_collections (
                 id           TEXT PRIMARY KEY,
                 collected_at REAL NOT NULL,
                 source       TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS river_levels (
                 collection_id TEXT NOT NULL REFERENCES flood_collections(id),
                 station       TEXT NOT NULL,
                 level_m       REAL NOT NULL,
                 alert_level   TEXT
             );
             CREATE TABLE IF NOT EXISTS weather_readings (
                 collection_id  TEXT NOT NULL REFERENCES flood_collections(id),
                 lat            REAL NOT NULL,
                 lon            REAL NOT NULL,
                 rainfall_mm_1h REAL NOT NULL,
                 temperature_c  REAL
             );
             CREATE INDEX IF NOT EXISTS idx_collections_time
                 ON flood_collections(collected_at);",
        )
        .map_err(storage_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl FloodDataRepository for SqliteFloodDataRepository {
    fn record_collection(&self, collection: &FloodCollection) -> Result<(), RepositoryError> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction().map_err(storage_err)?;
        {
            tx.execute(
                "INSERT INTO flood_collections (id, collected_at, source) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    collection.id.to_string(),
                    collection.collected_at.0,
                    collection.source,
                ],
            )
            .map_err(storage_err)?;

            let mut rivers = tx
                .prepare_cached(
                    "INSERT INTO river_levels (collection_id, station, level_m, alert_level) \
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(storage_err)?;
            for row in &collection.river_levels {
                rivers
                    .execute(rusqlite::params![
                        collection.id.to_string(),
                        row.station,
                        row.level_m as f64,
                        row.alert_level,
                    ])
                    .map_err(storage_err)?;
            }

            let mut weather = tx
                .prepare_cached(
                    "INSERT INTO weather_readings \
                     (collection_id, lat, lon, rainfall_mm_1h, temperature_c) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(storage_err)?;
            for row in &collection.weather {
                weather
                    .execute(rusqlite::params![
                        collection.id.to_string(),
                        row.location.lat as f64,
                        row.location.lon as f64,
                        row.rainfall_mm_1h as f64,
                        row.temperature_c.map(|t| t as f64),
                    ])
                    .map_err(storage_err)?;
            }
        }
        tx.commit().map_err(storage_err)
    }

    fn recent_collections(&self, limit: usize) -> Result<Vec<FloodCollection>, RepositoryError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, collected_at, source FROM flood_collections \
                 ORDER BY collected_at DESC LIMIT ?1",
            )
            .map_err(storage_err)?;
        let headers = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)?;

        let mut rivers = conn
            .prepare_cached(
                "SELECT station, level_m, alert_level FROM river_levels WHERE collection_id = ?1",
            )
            .map_err(storage_err)?;
        let mut weather = conn
            .prepare_cached(
                "SELECT lat, lon, rainfall_mm_1h, temperature_c FROM weather_readings \
                 WHERE collection_id = ?1",
            )
            .map_err(storage_err)?;

        let mut collections = Vec::with_capacity(headers.len());
        for (id, collected_at, source) in headers {
            let parsed = Uuid::parse_str(&id)
                .map_err(|e| RepositoryError::Storage(format!("bad collection id: {e}")))?;

            let river_levels = rivers
                .query_map([&id], |row| {
                    Ok(RiverLevelRow {
                        station: row.get(0)?,
                        level_m: row.get::<_, f64>(1)? as f32,
                        alert_level: row.get(2)?,
                    })
                })
                .map_err(storage_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_err)?;

            let weather_rows = weather
                .query_map([&id], |row| {
                    Ok(WeatherRow {
                        location: GeoPoint::new(
                            row.get::<_, f64>(0)? as f32,
                            row.get::<_, f64>(1)? as f32,
                        ),
                        rainfall_mm_1h: row.get::<_, f64>(2)? as f32,
                        temperature_c: row.get::<_, Option<f64>>(3)?.map(|t| t as f32),
                    })
                })
                .map_err(storage_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_err)?;

            collections.push(FloodCollection {
                id: parsed,
                collected_at: Timestamp(collected_at),
                source,
                river_levels,
                weather: weather_rows,
            });
        }
        Ok(collections)
    }
}
