//! `SQLite` connection pooling.
//!
//! Every connection handed out by the pool has WAL mode, foreign keys, and
//! a busy timeout applied by [`PragmaCustomizer`]. The busy timeout is what
//! lets two writers contend on the capacity check: the second `BEGIN
//! IMMEDIATE` waits for the first to commit instead of failing immediately.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// The pool type used throughout the workspace.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// A connection checked out of the pool.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool tuning knobs.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pool size (default: 8).
    pub pool_size: u32,
    /// How long a writer waits on a locked database before erroring,
    /// in milliseconds (default: 5000).
    pub busy_timeout_ms: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA foreign_keys = ON;\
             PRAGMA busy_timeout = {};\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
    }
}

fn build(manager: SqliteConnectionManager, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(std::time::Duration::from_secs(5))
        .connection_customizer(Box::new(PragmaCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(manager)?;
    Ok(pool)
}

/// Open a file-backed pool.
pub fn new_file(path: &str, config: &ConnectionConfig) -> Result<ConnectionPool> {
    build(SqliteConnectionManager::file(path), config)
}

/// Open a file-backed pool from loaded settings.
pub fn new_from_settings(db: &precept_settings::DatabaseSettings) -> Result<ConnectionPool> {
    new_file(
        &db.path,
        &ConnectionConfig {
            pool_size: db.pool_size,
            busy_timeout_ms: db.busy_timeout_ms,
        },
    )
}

/// Open an in-memory pool for tests.
///
/// A pooled `:memory:` database is private to each connection, so this pool
/// is pinned to a single connection and every checkout sees the same data.
/// Cross-connection tests (writer contention) need [`new_file`] instead.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    let single = ConnectionConfig {
        pool_size: 1,
        ..config.clone()
    };
    build(SqliteConnectionManager::memory(), &single)
}

/// Read back the pragmas that matter, for startup sanity checks.
pub fn verify_pragmas(conn: &Connection) -> Result<PragmaState> {
    let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
    let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
    Ok(PragmaState {
        journal_mode,
        foreign_keys_enabled: foreign_keys == 1,
    })
}

/// Observed pragma state of a live connection.
#[derive(Debug)]
pub struct PragmaState {
    /// Journal mode ("wal" for file databases, "memory" in-memory).
    pub journal_mode: String,
    /// Whether foreign key enforcement is on.
    pub foreign_keys_enabled: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
