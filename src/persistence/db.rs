//! Database Connection and Setup
//!
//! Manages the SQLite connection, pragmas and migrations.

use log::{debug, info};
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::invalidation::{InvalidationTracker, Table};
use crate::domain::{DomainError, DomainResult};

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => DomainError::Conflict(e.to_string()),
            _ => DomainError::Storage(e.to_string()),
        }
    }
}

/// Database state wrapper
///
/// Cloning is cheap: every clone shares the same connection and tracker.
#[derive(Clone)]
pub struct DbState {
    pub conn: Arc<Mutex<Connection>>,
    pub tracker: InvalidationTracker,
}

impl DbState {
    fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            tracker: InvalidationTracker::new(),
        }
    }

    /// Open a fresh in-memory database with the full schema
    pub async fn open_in_memory() -> DomainResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn, false)?;
        run_migrations(&conn)?;
        Ok(Self::new(conn))
    }

    /// Publish a committed write to observers of `tables`
    pub fn notify(&self, tables: &[Table]) {
        self.tracker.notify(tables);
    }
}

/// Initialize database with path
pub async fn init_db(db_path: &Path) -> DomainResult<DbState> {
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| DomainError::Storage(format!("Failed to create {}: {}", dir.display(), e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| DomainError::Storage(format!("Failed to open {}: {}", db_path.display(), e)))?;

    configure(&conn, true)?;
    run_migrations(&conn)?;

    info!("Database ready at {}", db_path.display());
    Ok(DbState::new(conn))
}

fn configure(conn: &Connection, file_backed: bool) -> DomainResult<()> {
    if file_backed {
        // journal_mode returns a row, so it can't go through execute_batch
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!("journal_mode = {}", mode);
    }

    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS todos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            due_date INTEGER,
            completed INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sub_todos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            todo_id INTEGER NOT NULL REFERENCES todos(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sub_todos_todo ON sub_todos(todo_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS live_activities (
            id TEXT PRIMARY KEY NOT NULL,
            created_at INTEGER NOT NULL,
            payload TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    Ok(())
}
