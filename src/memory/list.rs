//! Unranked reads: single and batched lookup, listing/export, and the pages
//! the sync daemon walks.

use anyhow::Result;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;

use super::types::MemoryRecord;
use super::{bytes_to_embedding, memory_from_row, MEMORY_COLUMNS};

/// Options for [`list_memories`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub limit: usize,
    pub memory_type: Option<String>,
}

/// Fetch one memory by id, with its cached embedding.
pub fn get_memory(conn: &Connection, id: &str) -> Result<Option<MemoryRecord>> {
    let sql = format!("SELECT {MEMORY_COLUMNS}, m.embedding FROM memories m WHERE m.id = ?1");
    Ok(query_with_embeddings(conn, &sql, params![id])?.pop())
}

/// All memories, newest first, optionally restricted to one type.
pub fn list_memories(conn: &Connection, options: &ListOptions) -> Result<Vec<MemoryRecord>> {
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories m \
         WHERE (?1 IS NULL OR m.type = ?1) \
         ORDER BY m.timestamp DESC, m.rowid DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![options.memory_type, options.limit as i64],
            memory_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Fetch every memory in `ids` that still exists, keyed by id.
pub fn get_many(conn: &Connection, ids: &[String]) -> Result<HashMap<String, MemoryRecord>> {
    let mut found = HashMap::with_capacity(ids.len());
    // Stay well under SQLite's bound-parameter limit.
    for chunk in ids.chunks(500) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories m WHERE m.id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk), memory_from_row)?;
        for row in rows {
            let record = row?;
            found.insert(record.id.clone(), record);
        }
    }
    Ok(found)
}

/// A record the sync daemon may push, with whether the remote is known to
/// hold its current content.
#[derive(Debug, Clone)]
pub struct SyncCandidate {
    pub record: MemoryRecord,
    /// Changed (or never pushed) since the last successful upload.
    pub dirty: bool,
}

/// Up to `limit` records for one sync tick: unsynced rows first, then the
/// newest synced ones so a replica that lost rows is noticed. Newest first
/// within each group.
pub fn sync_candidates(conn: &Connection, limit: usize) -> Result<Vec<SyncCandidate>> {
    let sql = format!(
        "SELECT {MEMORY_COLUMNS}, m.embedding, m.synced_at IS NULL FROM memories m \
         ORDER BY m.synced_at IS NULL DESC, m.timestamp DESC, m.rowid DESC LIMIT ?1"
    );
    query_candidates(conn, &sql, params![limit as i64])
}

/// One page of the whole store, oldest first, for bulk migration.
pub fn page_for_migration(conn: &Connection, offset: usize, limit: usize) -> Result<Vec<SyncCandidate>> {
    let sql = format!(
        "SELECT {MEMORY_COLUMNS}, m.embedding, m.synced_at IS NULL FROM memories m \
         ORDER BY m.timestamp ASC, m.rowid ASC LIMIT ?1 OFFSET ?2"
    );
    query_candidates(conn, &sql, params![limit as i64, offset as i64])
}

fn query_candidates(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<SyncCandidate>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            let mut record = memory_from_row(row)?;
            let blob: Option<Vec<u8>> = row.get(7)?;
            record.embedding = blob.map(|b| bytes_to_embedding(&b));
            Ok(SyncCandidate {
                record,
                dirty: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_with_embeddings(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<MemoryRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            let mut record = memory_from_row(row)?;
            let blob: Option<Vec<u8>> = row.get(7)?;
            record.embedding = blob.map(|b| bytes_to_embedding(&b));
            Ok(record)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
