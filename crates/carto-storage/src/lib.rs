//! carto-storage: SQLite persistence layer for the carto code graph.
//!
//! Uses rusqlite with bundled SQLite, WAL mode, and an embedded schema.
//! The write path (the merge engine) lives in [`merge`]; read-only queries
//! live in [`queries`].

use carto_core::CartoError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

mod merge;
mod queries;

const SCHEMA: &str = include_str!("schema.sql");

/// SQLite-backed store for code graph nodes, edges, and file hash records.
///
/// Wraps `rusqlite::Connection` in a `Mutex` so a store handle can be shared
/// across threads; the merge engine's per-project transaction is the
/// serialization boundary for writes.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Get a lock on the underlying connection.
    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Store mutex poisoned")
    }

    /// Open (or create) a carto database at the given path with default
    /// tuning (64MB cache, 5s busy timeout).
    pub fn open(path: &Path) -> Result<Self, CartoError> {
        Self::open_with(path, 64, 5)
    }

    /// Open with explicit cache size (MB) and busy timeout (seconds).
    pub fn open_with(
        path: &Path,
        cache_size_mb: u32,
        busy_timeout_secs: u64,
    ) -> Result<Self, CartoError> {
        let conn = Connection::open(path).map_err(|e| CartoError::Storage(e.to_string()))?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        // Negative cache_size means KB
        conn.pragma_update(None, "cache_size", -(cache_size_mb as i64 * 1000))
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        // Temp tables in memory
        conn.pragma_update(None, "temp_store", "MEMORY")
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        conn.busy_timeout(std::time::Duration::from_secs(busy_timeout_secs))
            .map_err(|e| CartoError::Storage(e.to_string()))?;

        // Apply schema
        conn.execute_batch(SCHEMA)
            .map_err(|e| CartoError::Storage(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, CartoError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CartoError::Storage(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}
