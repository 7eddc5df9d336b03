//! Write path: id/timestamp assignment, row insert, and FTS5 sync.
//!
//! [`store_memory`] runs inside one transaction so a reader never sees a row
//! without its index entry or the reverse. Reusing an id replaces the old row
//! (delete + reinsert), which also drops any cached embedding and marks the
//! row unsynced so the replica is pushed again.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use super::types::{MemoryRecord, NewMemory, StoreResult, DEFAULT_MEMORY_TYPE};

/// Persist a memory. Missing `id`/`timestamp` are assigned here.
pub fn store_memory(conn: &mut Connection, new: NewMemory) -> Result<StoreResult> {
    if new.content.trim().is_empty() {
        bail!("content must not be empty");
    }

    let id = match new.id {
        Some(id) if !id.trim().is_empty() => id,
        _ => uuid::Uuid::now_v7().to_string(),
    };
    let timestamp = new.timestamp.unwrap_or_else(super::now_millis);
    let memory_type = new
        .memory_type
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MEMORY_TYPE.to_string());
    let importance = new.importance.unwrap_or_default();
    let metadata = new
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("failed to serialize metadata")?;

    let tx = conn.transaction()?;

    let replaced = remove_memory_row(&tx, &id)?;
    // The id is live again; a queued remote delete would remove the new copy.
    tx.execute("DELETE FROM pending_deletes WHERE id = ?1", params![id])?;

    let now = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO memories (id, content, type, category, importance, metadata, timestamp, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            new.content,
            memory_type,
            new.category,
            importance.as_str(),
            metadata,
            timestamp,
            now,
        ],
    )?;
    let rowid = tx.last_insert_rowid();

    tx.execute(
        "INSERT INTO memories_fts (rowid, content, type, category, metadata) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![rowid, new.content, memory_type, new.category, metadata],
    )?;

    tx.commit()?;

    if replaced {
        tracing::debug!(id = %id, "replaced existing memory");
    }

    Ok(StoreResult { id, timestamp })
}

/// Delete a row and its FTS5 entry. Returns `false` if no row had this id.
///
/// The external-content FTS table needs the old column values for its
/// `'delete'` command, so they are read before the row goes.
pub(crate) fn remove_memory_row(tx: &Transaction, id: &str) -> Result<bool> {
    let existing: Option<(i64, String, String, Option<String>, Option<String>)> = tx
        .query_row(
            "SELECT rowid, content, type, category, metadata FROM memories WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .optional()?;

    let Some((rowid, content, memory_type, category, metadata)) = existing else {
        return Ok(false);
    };

    tx.execute(
        "INSERT INTO memories_fts(memories_fts, rowid, content, type, category, metadata) \
         VALUES('delete', ?1, ?2, ?3, ?4, ?5)",
        params![rowid, content, memory_type, category, metadata],
    )?;
    tx.execute("DELETE FROM memories WHERE rowid = ?1", params![rowid])?;

    Ok(true)
}

/// Cache a generated embedding. Existing embeddings are never overwritten.
///
/// `content` is the text that was embedded; if the row has been replaced
/// since, nothing is written. Returns `true` if the row was updated.
pub fn set_embedding_if_missing(
    conn: &Connection,
    id: &str,
    content: &str,
    embedding: &[f32],
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE memories SET embedding = ?1 WHERE id = ?2 AND content = ?3 AND embedding IS NULL",
        params![super::embedding_to_bytes(embedding), id, content],
    )?;
    Ok(rows > 0)
}

/// Record that `record` as read has reached the remote index.
///
/// Matches only while the stored row still carries the same fields, so a
/// replace that landed during the upload leaves the row unsynced. Returns
/// `true` if the row was marked.
pub fn mark_synced(conn: &Connection, record: &MemoryRecord, at: i64) -> Result<bool> {
    let metadata = record
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("failed to serialize metadata")?;
    let rows = conn.execute(
        "UPDATE memories SET synced_at = ?1 \
         WHERE id = ?2 AND content = ?3 AND type = ?4 AND category IS ?5 \
           AND importance = ?6 AND metadata IS ?7 AND timestamp = ?8",
        params![
            at,
            record.id,
            record.content,
            record.memory_type,
            record.category,
            record.importance.as_str(),
            metadata,
            record.timestamp,
        ],
    )?;
    Ok(rows > 0)
}

/// Force a row to be pushed again on the next sync.
pub fn mark_unsynced(conn: &Connection, id: &str) -> Result<bool> {
    let rows = conn.execute("UPDATE memories SET synced_at = NULL WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Drop every cached embedding and mark every row unsynced (after the
/// embedding model changed). Returns the number of vectors dropped.
pub fn clear_cached_embeddings(conn: &Connection) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE memories SET embedding = NULL WHERE embedding IS NOT NULL",
        [],
    )?;
    conn.execute("UPDATE memories SET synced_at = NULL", [])?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::types::Importance;

    fn test_db() -> Connection {
        db::open_in_memory().unwrap()
    }

    fn fts_hits(conn: &Connection, term: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM memories_fts WHERE memories_fts MATCH ?1",
            params![term],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_store_assigns_id_and_timestamp() {
        let mut conn = test_db();
        let before = crate::memory::now_millis();

        let result = store_memory(&mut conn, NewMemory::new("Rust is a systems language")).unwrap();

        assert!(!result.id.is_empty());
        assert!(result.timestamp >= before);

        let (content, memory_type, importance): (String, String, String) = conn
            .query_row(
                "SELECT content, type, importance FROM memories WHERE id = ?1",
                params![result.id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(content, "Rust is a systems language");
        assert_eq!(memory_type, "general");
        assert_eq!(importance, "medium");
    }

    #[test]
    fn test_store_keeps_supplied_id_and_timestamp() {
        let mut conn = test_db();
        let mut new = NewMemory::new("supplied");
        new.id = Some("custom-id".into());
        new.timestamp = Some(1_700_000_000_000);
        new.importance = Some(Importance::Critical);

        let result = store_memory(&mut conn, new).unwrap();
        assert_eq!(result.id, "custom-id");
        assert_eq!(result.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_store_indexes_all_text_fields() {
        let mut conn = test_db();
        let mut new = NewMemory::new("The quantum computer runs cold")
            .with_type("solution")
            .with_category("hardware");
        new.metadata = Some(serde_json::json!({"vendor": "acmequbit"}));
        store_memory(&mut conn, new).unwrap();

        assert_eq!(fts_hits(&conn, "quantum"), 1);
        assert_eq!(fts_hits(&conn, "solution"), 1);
        assert_eq!(fts_hits(&conn, "hardware"), 1);
        assert_eq!(fts_hits(&conn, "acmequbit"), 1);
    }

    #[test]
    fn test_reusing_id_overwrites() {
        let mut conn = test_db();
        let mut first = NewMemory::new("original walrus text");
        first.id = Some("same".into());
        store_memory(&mut conn, first).unwrap();
        set_embedding_if_missing(&conn, "same", "original walrus text", &[0.1, 0.2]).unwrap();

        let mut second = NewMemory::new("replacement narwhal text");
        second.id = Some("same".into());
        store_memory(&mut conn, second).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memories WHERE id = 'same'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(fts_hits(&conn, "walrus"), 0);
        assert_eq!(fts_hits(&conn, "narwhal"), 1);

        let embedding: Option<Vec<u8>> = conn
            .query_row("SELECT embedding FROM memories WHERE id = 'same'", [], |r| r.get(0))
            .unwrap();
        assert!(embedding.is_none(), "overwrite clears the cached embedding");
    }

    #[test]
    fn test_empty_content_rejected() {
        let mut conn = test_db();
        let err = store_memory(&mut conn, NewMemory::new("   ")).unwrap_err();
        assert!(err.to_string().contains("content must not be empty"));
    }

    #[test]
    fn test_metadata_round_trips_unchanged() {
        let mut conn = test_db();
        let metadata = serde_json::json!({"nested": {"list": [1, 2, 3]}, "flag": true});
        let mut new = NewMemory::new("with metadata");
        new.metadata = Some(metadata.clone());
        let id = store_memory(&mut conn, new).unwrap().id;

        let stored: String = conn
            .query_row("SELECT metadata FROM memories WHERE id = ?1", params![id], |r| r.get(0))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_embedding_is_set_once() {
        let mut conn = test_db();
        let id = store_memory(&mut conn, NewMemory::new("embed me")).unwrap().id;

        assert!(!set_embedding_if_missing(&conn, &id, "embed someone else", &[0.5, 0.5]).unwrap());
        assert!(set_embedding_if_missing(&conn, &id, "embed me", &[1.0, 0.0]).unwrap());
        assert!(!set_embedding_if_missing(&conn, &id, "embed me", &[0.0, 1.0]).unwrap());

        let bytes: Vec<u8> = conn
            .query_row("SELECT embedding FROM memories WHERE id = ?1", params![id], |r| r.get(0))
            .unwrap();
        assert_eq!(crate::memory::bytes_to_embedding(&bytes), vec![1.0, 0.0]);

        assert_eq!(clear_cached_embeddings(&conn).unwrap(), 1);
    }

    fn synced_at(conn: &Connection, id: &str) -> Option<i64> {
        conn.query_row("SELECT synced_at FROM memories WHERE id = ?1", params![id], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_mark_synced_needs_an_unchanged_row() {
        let mut conn = test_db();
        let mut new = NewMemory::new("boiler pressure is 1.5 bar").with_category("home");
        new.id = Some("boiler".into());
        new.metadata = Some(serde_json::json!({"room": "utility"}));
        store_memory(&mut conn, new.clone()).unwrap();
        let read = crate::memory::list::get_memory(&conn, "boiler").unwrap().unwrap();
        assert_eq!(synced_at(&conn, "boiler"), None);

        assert!(mark_synced(&conn, &read, 42).unwrap());
        assert_eq!(synced_at(&conn, "boiler"), Some(42));

        // A replace while the upload was in flight: the old read no longer matches.
        new.content = "boiler pressure is 1.2 bar".into();
        store_memory(&mut conn, new).unwrap();
        assert_eq!(synced_at(&conn, "boiler"), None);
        assert!(!mark_synced(&conn, &read, 43).unwrap());
        assert_eq!(synced_at(&conn, "boiler"), None);
    }

    #[test]
    fn test_clearing_embeddings_marks_rows_unsynced() {
        let mut conn = test_db();
        let id = store_memory(&mut conn, NewMemory::new("cached row")).unwrap().id;
        let read = crate::memory::list::get_memory(&conn, &id).unwrap().unwrap();
        set_embedding_if_missing(&conn, &id, "cached row", &[1.0]).unwrap();
        mark_synced(&conn, &read, 7).unwrap();

        assert_eq!(clear_cached_embeddings(&conn).unwrap(), 1);
        assert_eq!(synced_at(&conn, &id), None);
    }

    #[test]
    fn test_restoring_an_id_cancels_its_pending_remote_delete() {
        let mut conn = test_db();
        crate::memory::forget::queue_remote_delete(&conn, "phoenix", 1).unwrap();
        let mut new = NewMemory::new("back again");
        new.id = Some("phoenix".into());
        store_memory(&mut conn, new).unwrap();
        assert!(crate::memory::forget::pending_remote_deletes(&conn, 10).unwrap().is_empty());
    }
}
