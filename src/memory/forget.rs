//! Hard deletion from the local store.
//!
//! Removes the row and its FTS5 entry in one transaction. Removing the remote
//! replica is the caller's job (see `retrieval::MemoryService::delete`); when
//! that fails the id is queued here and the sync daemon retries it.

use anyhow::Result;
use rusqlite::{params, Connection};

use super::store::remove_memory_row;
use super::types::DeleteResult;

/// Delete a memory by id. An unknown id is `success: false`, not an error.
pub fn delete_memory(conn: &mut Connection, memory_id: &str) -> Result<DeleteResult> {
    let tx = conn.transaction()?;
    let removed = remove_memory_row(&tx, memory_id)?;
    tx.commit()?;

    Ok(DeleteResult { success: removed })
}

/// Remember that `id` still has to be deleted from the remote index.
pub fn queue_remote_delete(conn: &Connection, id: &str, at: i64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO pending_deletes (id, deleted_at) VALUES (?1, ?2)",
        params![id, at],
    )?;
    Ok(())
}

/// Up to `limit` queued remote deletes, oldest first.
pub fn pending_remote_deletes(conn: &Connection, limit: usize) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM pending_deletes ORDER BY deleted_at ASC, id ASC LIMIT ?1")?;
    let ids = stmt
        .query_map(params![limit as i64], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub fn clear_remote_delete(conn: &Connection, id: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM pending_deletes WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}
