//! `masfro-store` — repository implementations.
//!
//! The core only ever sees the repository traits from `masfro-core`; this
//! crate supplies the production SQLite backends (WAL mode, prepared
//! statements, one transaction per collection) and an in-memory evacuation
//! repository for tests and demos.
//!
//! | Module         | Contents                                           |
//! |----------------|----------------------------------------------------|
//! | [`evacuation`] | `MemoryEvacuationRepository`, `SqliteEvacuationRepository` |
//! | [`flood_data`] | `SqliteFloodDataRepository`                        |

pub mod evacuation;
pub mod flood_data;


pub use evacuation::{MemoryEvacuationRepository, SqliteEvacuationRepository};
pub use flood_data::SqliteFloodDataRepository;

use masfro_core::RepositoryError;

/// Map a rusqlite failure onto the repository error surface.
pub(crate) fn storage_err(error: rusqlite::Error) -> RepositoryError {
    RepositoryError::Storage(error.to_string())
}
