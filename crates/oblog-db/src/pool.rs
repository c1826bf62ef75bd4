//! Pooled SQLite connections for the event log.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Path that selects a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Connection tunables for the event log database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long an append waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on concurrent loggers holding a connection.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// Pool shared by every reader and writer of the event log.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool could not open its first connection.
    #[error("failed to open event log database: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens a pool over the event log database.
///
/// File databases run in WAL mode so history reads do not block appends
/// from other loggers.
///
/// Every SQLite connection to `:memory:` opens its own empty database, so
/// for [`MEMORY_PATH`] the pool is pinned to a single connection that is
/// never recycled. Callers then all see the same database.
///
/// # Arguments
///
/// * `db_path` - Path to the SQLite database file, or [`MEMORY_PATH`].
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the connection pool cannot be created.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let busy_timeout_ms = settings.busy_timeout_ms;
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| init_connection(conn, busy_timeout_ms));

    let in_memory = db_path == MEMORY_PATH;
    let builder = if in_memory {
        tracing::debug!("in-memory database requested, pinning pool to one connection");
        Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        Pool::builder().max_size(settings.pool_max_size)
    };

    let pool = builder.build(manager)?;

    Ok(pool)
}

fn init_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    // `:memory:` stays in "memory" journal mode.
    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if journal_mode != "wal" && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("event log needs WAL journal mode, got: {journal_mode}")),
        ));
    }
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_pool_applies_connection_pragmas() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("events.db");
        let settings = DbRuntimeSettings {
            busy_timeout_ms: 2_500,
            pool_max_size: 3,
        };

        let pool = create_pool(path.to_str().expect("utf-8 path"), settings)
            .expect("pool creation should succeed");
        let conn = pool.get().expect("should get a connection");

        let mode: String = conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .expect("should query journal_mode");
        assert_eq!(mode, "wal");

        let busy_timeout: i32 = conn
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
            .expect("should query busy_timeout");
        assert_eq!(busy_timeout, 2_500, "busy timeout should match settings");

        assert_eq!(pool.max_size(), 3, "pool max size should match settings");
    }

    #[test]
    fn in_memory_pool_is_pinned_to_one_connection() {
        let pool = create_pool(MEMORY_PATH, DbRuntimeSettings::default())
            .expect("pool creation should succeed");
        assert_eq!(pool.max_size(), 1);

        {
            let conn = pool.get().expect("should get a connection");
            conn.execute_batch("CREATE TABLE visits (id INTEGER PRIMARY KEY);")
                .expect("should create visits table");
        }

        // Appends and reads share the one database.
        let conn = pool.get().expect("should get a connection again");
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'visits')",
                [],
                |row| row.get(0),
            )
            .expect("should query sqlite_master");
        assert!(exists, "table should survive connection return");
    }
}
