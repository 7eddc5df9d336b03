//! SQL DDL for the local store.
//!
//! Defines the version 1 layout: the `memories` table, its `memories_fts`
//! (FTS5) external-content index, and `schema_meta`. Later versions are
//! layered on by [`super::migrations`]. All DDL uses `IF NOT EXISTS` for
//! idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for the local tables.
const SCHEMA_SQL: &str = r#"
-- Core memory storage (source of truth)
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT 'general',
    category TEXT,
    importance TEXT NOT NULL DEFAULT 'medium'
        CHECK(importance IN ('low','medium','high','critical')),
    metadata TEXT,
    timestamp INTEGER NOT NULL,
    embedding BLOB,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(type);
CREATE INDEX IF NOT EXISTS idx_memories_timestamp ON memories(timestamp);
CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);

-- Full-text search (BM25), kept in sync by the write path
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    content,
    type,
    category,
    metadata,
    content='memories',
    content_rowid='rowid'
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
