use anyhow::Result;
use rusqlite::{params, Connection};

use super::types::{HitSource, SearchHit};
use super::{memory_from_row, MEMORY_COLUMNS};

// ── Public types ──────────────────────────────────────────────────────────────

/// Similarity reported for every substring-fallback hit.
///
/// FTS hits are normalized against the best hit of their own result set, so
/// the rank-1 lexical match scores 1.0. Fallback hits are unranked, and sit at
/// the midpoint of the same `[0, 1]` scale.
pub const SUBSTRING_SIMILARITY: f64 = 0.5;

/// Shortest term kept in a keyword query.
const MIN_TERM_CHARS: usize = 3;

/// Filters and limits for a keyword search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub memory_type: Option<String>,
    /// When `false`, memories typed or categorized as `error`/`failure` are skipped.
    pub include_failures: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            memory_type: None,
            include_failures: true,
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Keyword search: FTS5 BM25 ranking, newest first on ties.
///
/// An empty query (after dropping short terms) yields no results. If the FTS
/// query itself fails, the same filters are applied to a case-insensitive
/// substring scan instead.
pub fn search_memories(
    conn: &Connection,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchHit>> {
    let Some(fts_query) = build_fts_query(query) else {
        return Ok(Vec::new());
    };

    match fts_search(conn, &fts_query, options) {
        Ok(hits) => Ok(hits),
        Err(e) => {
            tracing::warn!(error = %e, query = %fts_query, "FTS query failed, falling back to substring scan");
            substring_search(conn, query.trim(), options)
        }
    }
}

/// Turn free text into an FTS5 query: each term longer than two characters
/// is quoted and the terms are OR-ed together.
///
/// Returns `None` when no usable term remains.
pub fn build_fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|word| word.replace('"', ""))
        .filter(|word| word.chars().count() >= MIN_TERM_CHARS)
        .map(|word| format!("\"{word}\""))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Shared WHERE fragment for the type filter (`?2`) and the failure filter (`?3`).
const FILTER_SQL: &str = "(?2 IS NULL OR m.type = ?2) \
     AND (?3 OR (LOWER(m.type) NOT IN ('error', 'failure') \
              AND LOWER(COALESCE(m.category, '')) NOT IN ('error', 'failure')))";

/// FTS5 BM25 search.
///
/// FTS5 rank is negative (more negative = better); the magnitude is divided by
/// the best magnitude in the result set to land in `[0, 1]`.
fn fts_search(conn: &Connection, fts_query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
    let sql = format!(
        "SELECT {MEMORY_COLUMNS}, bm25(memories_fts) AS bm25_score \
         FROM memories_fts JOIN memories m ON m.rowid = memories_fts.rowid \
         WHERE memories_fts MATCH ?1 AND {FILTER_SQL} \
         ORDER BY bm25_score, m.timestamp DESC LIMIT ?4"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![
                fts_query,
                options.memory_type,
                options.include_failures,
                options.limit as i64
            ],
            |row| Ok((memory_from_row(row)?, row.get::<_, f64>(7)?)),
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let best = rows.first().map(|(_, rank)| -rank).unwrap_or(0.0);
    let hits = rows
        .into_iter()
        .map(|(memory, rank)| {
            let similarity = if best > 0.0 {
                (-rank / best).clamp(0.0, 1.0)
            } else {
                1.0
            };
            SearchHit::keyword(memory, similarity, HitSource::Keyword)
        })
        .collect();
    Ok(hits)
}

/// Case-insensitive "contains" scan over content, type, category, and metadata.
fn substring_search(conn: &Connection, needle: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories m \
         WHERE (LOWER(m.content) LIKE ?1 ESCAPE '\\' \
             OR LOWER(m.type) LIKE ?1 ESCAPE '\\' \
             OR LOWER(COALESCE(m.category, '')) LIKE ?1 ESCAPE '\\' \
             OR LOWER(COALESCE(m.metadata, '')) LIKE ?1 ESCAPE '\\') \
           AND {FILTER_SQL} \
         ORDER BY m.timestamp DESC LIMIT ?4"
    );

    let mut stmt = conn.prepare(&sql)?;
    let hits = stmt
        .query_map(
            params![
                pattern,
                options.memory_type,
                options.include_failures,
                options.limit as i64
            ],
            memory_from_row,
        )?
        .map(|row| row.map(|m| SearchHit::keyword(m, SUBSTRING_SIMILARITY, HitSource::Substring)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hits)
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
