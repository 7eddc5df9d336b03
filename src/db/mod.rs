pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// Open (or create) the memory database at the given path with the schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL keeps readers off the writer's back; the busy timeout covers the CLI
    // touching the file while the server runs.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&mut conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open a fully migrated in-memory database (tests and dry runs).
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&mut conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub sqlite_version: String,
    pub embedding_model: Option<String>,
    pub memory_count: u64,
    pub fts_row_count: u64,
    pub embedded_count: u64,
    /// Rows whose current content has not reached the remote index yet.
    pub unsynced_count: u64,
    /// Remote deletes still waiting to be retried.
    pub pending_delete_count: u64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Run integrity checks and gather row counts.
///
/// `fts_row_count` counts documents in the FTS5 index itself (its docsize
/// shadow table) and should always equal `memory_count`.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;
    let sqlite_version: String = conn.query_row("SELECT sqlite_version()", [], |r| r.get(0))?;
    let embedding_model = migrations::get_embedding_model(conn)?;

    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |r| r.get(0))?;
        Ok(n as u64)
    };
    let memory_count = count("SELECT COUNT(*) FROM memories")?;
    let fts_row_count = count("SELECT COUNT(*) FROM memories_fts_docsize")?;
    let embedded_count = count("SELECT COUNT(*) FROM memories WHERE embedding IS NOT NULL")?;
    let unsynced_count = count("SELECT COUNT(*) FROM memories WHERE synced_at IS NULL")?;
    let pending_delete_count = count("SELECT COUNT(*) FROM pending_deletes")?;

    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |r| r.get(0))?;
    let integrity_ok = integrity == "ok";

    Ok(HealthReport {
        schema_version,
        sqlite_version,
        embedding_model,
        memory_count,
        fts_row_count,
        embedded_count,
        unsynced_count,
        pending_delete_count,
        integrity_ok,
        integrity_details: integrity,
    })
}
