use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::BTreeMap;

/// Window for [`StatsResponse::recent_memories`].
const RECENT_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Aggregate counts over the local store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_memories: u64,
    pub distinct_types: u64,
    pub distinct_categories: u64,
    /// Per-type breakdown.
    pub memory_types: BTreeMap<String, u64>,
    /// Memories whose timestamp falls within the last 24 hours.
    pub recent_memories: u64,
    /// Memories with a cached embedding.
    pub with_embedding: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_timestamp: Option<i64>,
}

/// Compute statistics, counting "recent" relative to `now_ms`.
pub fn memory_stats(conn: &Connection, now_ms: i64) -> Result<StatsResponse> {
    let (total, distinct_types, distinct_categories, with_embedding, oldest, newest): (
        i64,
        i64,
        i64,
        i64,
        Option<i64>,
        Option<i64>,
    ) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT type), COUNT(DISTINCT category), \
                COUNT(embedding), MIN(timestamp), MAX(timestamp) \
         FROM memories",
        [],
        |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        },
    )?;

    let recent: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE timestamp > ?1",
        params![now_ms - RECENT_WINDOW_MS],
        |row| row.get(0),
    )?;

    Ok(StatsResponse {
        total_memories: total as u64,
        distinct_types: distinct_types as u64,
        distinct_categories: distinct_categories as u64,
        memory_types: count_by_type(conn)?,
        recent_memories: recent as u64,
        with_embedding: with_embedding as u64,
        oldest_timestamp: oldest,
        newest_timestamp: newest,
    })
}

fn count_by_type(conn: &Connection) -> Result<BTreeMap<String, u64>> {
    let mut stmt = conn.prepare("SELECT type, COUNT(*) FROM memories GROUP BY type")?;
    let rows: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|(t, n)| (t, n as u64)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::store::{set_embedding_if_missing, store_memory};
    use crate::memory::types::NewMemory;

    const NOW: i64 = 1_750_000_000_000;
    const HOUR: i64 = 60 * 60 * 1000;

    fn insert(conn: &mut Connection, memory_type: &str, category: Option<&str>, timestamp: i64) -> String {
        let mut new = NewMemory::new("stats row").with_type(memory_type);
        new.category = category.map(str::to_string);
        new.timestamp = Some(timestamp);
        store_memory(conn, new).unwrap().id
    }

    #[test]
    fn test_empty_db_stats() {
        let conn = db::open_in_memory().unwrap();
        let stats = memory_stats(&conn, NOW).unwrap();
        assert_eq!(stats.total_memories, 0);
        assert_eq!(stats.distinct_types, 0);
        assert_eq!(stats.distinct_categories, 0);
        assert!(stats.memory_types.is_empty());
        assert_eq!(stats.recent_memories, 0);
        assert!(stats.oldest_timestamp.is_none());
        assert!(stats.newest_timestamp.is_none());
    }

    #[test]
    fn test_stats_counts_types_and_categories() {
        let mut conn = db::open_in_memory().unwrap();
        insert(&mut conn, "solution", Some("medical"), NOW - HOUR);
        insert(&mut conn, "solution", Some("medical"), NOW - 2 * HOUR);
        insert(&mut conn, "decision", Some("calendar"), NOW - 48 * HOUR);
        insert(&mut conn, "configuration", None, NOW - 72 * HOUR);

        let stats = memory_stats(&conn, NOW).unwrap();
        assert_eq!(stats.total_memories, 4);
        assert_eq!(stats.distinct_types, 3);
        assert_eq!(stats.distinct_categories, 2);
        assert_eq!(stats.memory_types["solution"], 2);
        assert_eq!(stats.memory_types["decision"], 1);
        assert_eq!(stats.recent_memories, 2);
        assert_eq!(stats.oldest_timestamp, Some(NOW - 72 * HOUR));
        assert_eq!(stats.newest_timestamp, Some(NOW - HOUR));
    }

    #[test]
    fn test_stats_counts_embeddings() {
        let mut conn = db::open_in_memory().unwrap();
        let id = insert(&mut conn, "note", None, NOW);
        insert(&mut conn, "note", None, NOW);
        set_embedding_if_missing(&conn, &id, "stats row", &[1.0]).unwrap();

        let stats = memory_stats(&conn, NOW).unwrap();
        assert_eq!(stats.with_embedding, 1);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let mut conn = db::open_in_memory().unwrap();
        insert(&mut conn, "note", None, NOW);
        let json = serde_json::to_value(memory_stats(&conn, NOW).unwrap()).unwrap();
        assert_eq!(json["totalMemories"], 1);
        assert_eq!(json["memoryTypes"]["note"], 1);
        assert_eq!(json["recentMemories"], 1);
    }
}
