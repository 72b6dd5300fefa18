//! Matrix cache entries, deterministic keys, and a SQLite-backed store.
//!
//! Entries are created on the first successful provider fetch, expire
//! after the configured lifetime, and are never mutated in place. The
//! SQLite implementation of the [`Cache`] interface degrades every
//! failure to a miss, logging the cause.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use routeflow_core::{Cache, Location, SquareMatrix};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload stored per cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixCacheEntry {
    /// Pairwise distances in kilometres.
    pub distance_matrix: SquareMatrix,
    /// Pairwise travel times in minutes, when the provider supplied them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_matrix: Option<SquareMatrix>,
    /// Matrix ordering at the time of the fetch.
    pub location_ids: Vec<String>,
    /// Creation instant, ISO-8601.
    pub created_at: DateTime<Utc>,
}

/// Deterministic cache key for a set of locations: an md5 digest over the
/// sorted IDs with their coordinates rounded to 5 decimal places.
#[must_use]
pub fn cache_key(locations: &[Location]) -> String {
    let mut parts: Vec<String> = locations
        .iter()
        .map(|location| {
            format!(
                "{}:{:.5}:{:.5}",
                location.id, location.latitude, location.longitude
            )
        })
        .collect();
    parts.sort();
    format!("{:x}", md5::compute(parts.join(";")))
}

/// Error raised when opening or initialising the SQLite cache.
#[derive(Debug, Error)]
pub enum SqliteCacheError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite cache at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating the cache table failed.
    #[error("failed to initialise cache schema: {0}")]
    Schema(#[source] rusqlite::Error),
}

/// Matrix cache persisted in a single SQLite table.
///
/// The connection sits behind a mutex so the cache satisfies the
/// `Send + Sync` bound of [`Cache`]; contention is limited to the brief
/// read or write of one row.
pub struct SqliteMatrixCache {
    connection: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteMatrixCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMatrixCache").finish_non_exhaustive()
    }
}

impl SqliteMatrixCache {
    /// Opens (creating if necessary) a cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SqliteCacheError> {
        let path = path.as_ref();
        let connection =
            Connection::open(path).map_err(|source| SqliteCacheError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::with_connection(connection)
    }

    /// An in-memory cache database, useful in tests.
    pub fn open_in_memory() -> Result<Self, SqliteCacheError> {
        let connection = Connection::open_in_memory().map_err(|source| {
            SqliteCacheError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            }
        })?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self, SqliteCacheError> {
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS matrix_cache (
                     cache_key TEXT PRIMARY KEY,
                     payload TEXT NOT NULL,
                     expires_at INTEGER NOT NULL
                 )",
                [],
            )
            .map_err(SqliteCacheError::Schema)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

impl Cache<MatrixCacheEntry> for SqliteMatrixCache {
    fn get(&self, key: &str) -> Option<MatrixCacheEntry> {
        let connection = match self.connection.lock() {
            Ok(connection) => connection,
            Err(poisoned) => poisoned.into_inner(),
        };
        let row: Option<(String, i64)> = match connection
            .query_row(
                "SELECT payload, expires_at FROM matrix_cache WHERE cache_key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        {
            Ok(row) => row,
            Err(err) => {
                log::warn!("matrix cache read failed for {key:?}: {err}");
                return None;
            }
        };
        let (payload, expires_at) = row?;

        if expires_at <= Utc::now().timestamp() {
            if let Err(err) =
                connection.execute("DELETE FROM matrix_cache WHERE cache_key = ?1", [key])
            {
                log::warn!("failed to evict expired cache entry {key:?}: {err}");
            }
            return None;
        }

        match serde_json::from_str(&payload) {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("corrupt matrix cache payload for {key:?}: {err}");
                None
            }
        }
    }

    fn put(&self, key: &str, value: MatrixCacheEntry, ttl: Duration) {
        let payload = match serde_json::to_string(&value) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("failed to serialise matrix cache entry {key:?}: {err}");
                return;
            }
        };
        let expires_at = Utc::now().timestamp() + i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let connection = match self.connection.lock() {
            Ok(connection) => connection,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = connection.execute(
            "INSERT OR REPLACE INTO matrix_cache (cache_key, payload, expires_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![key, payload, expires_at],
        ) {
            log::warn!("matrix cache write failed for {key:?}: {err}");
        }
    }
}
