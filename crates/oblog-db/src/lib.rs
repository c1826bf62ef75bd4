//! Database layer for the oblog event log.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization
//! and embedded SQL migrations. The `event_log` table and its indexes are
//! created exclusively through the versioned migrations managed here.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: no external database process is required and
//!   concurrent readers can run alongside the single writer that appends
//!   events.
//! - **`r2d2` connection pool**: bounded connection reuse for hosts that log
//!   from many threads.
//! - **Embedded migrations**: SQL files are compiled in via `include_str!`,
//!   so the schema cannot drift from the store code that reads it.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError, MEMORY_PATH};
