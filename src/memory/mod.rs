pub mod forget;
pub mod list;
pub mod local;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;

use rusqlite::Row;

use types::{Importance, MemoryRecord};

/// Column list matching [`memory_from_row`]. Queries alias `memories` as `m`.
pub(crate) const MEMORY_COLUMNS: &str =
    "m.id, m.content, m.type, m.category, m.importance, m.metadata, m.timestamp";

/// Build a [`MemoryRecord`] from a row selected with [`MEMORY_COLUMNS`].
///
/// The embedding is left empty; callers that need it read column 7 themselves.
pub(crate) fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let importance: String = row.get(4)?;
    let metadata: Option<String> = row.get(5)?;
    Ok(MemoryRecord {
        id: row.get(0)?,
        content: row.get(1)?,
        memory_type: row.get(2)?,
        category: row.get(3)?,
        importance: Importance::parse_lenient(Some(&importance)),
        metadata: metadata.and_then(|s| serde_json::from_str(&s).ok()),
        timestamp: row.get(6)?,
        embedding: None,
    })
}

/// Encode an embedding as little-endian f32 bytes for the `embedding` BLOB column.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a BLOB written by [`embedding_to_bytes`]. Trailing partial words are ignored.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
