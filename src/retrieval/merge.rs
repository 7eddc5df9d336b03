//! Weighted merge of semantic and keyword result lists.

use std::collections::HashMap;

use crate::memory::types::SearchHit;

/// Relative trust in each search path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub semantic: f64,
    pub keyword: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            semantic: 0.7,
            keyword: 0.3,
        }
    }
}

impl Weights {
    /// Caller-supplied semantic weight; keyword gets the remainder.
    pub fn from_semantic(semantic: f64) -> Self {
        let semantic = semantic.clamp(0.0, 1.0);
        Self {
            semantic,
            keyword: 1.0 - semantic,
        }
    }
}

/// Merge by id and re-rank.
///
/// A record found by both paths scores `semantic * ws + keyword * wk` and
/// carries both sources; a record found by one path scores its own
/// similarity times that path's weight. The local (keyword) copy of a record
/// wins over the remote one. Sorted by score, newer first on ties, then
/// truncated to `limit`.
pub fn merge_weighted(
    semantic: Vec<SearchHit>,
    keyword: Vec<SearchHit>,
    weights: Weights,
    limit: usize,
) -> Vec<SearchHit> {
    let mut merged: Vec<SearchHit> = Vec::with_capacity(semantic.len() + keyword.len());
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for mut hit in semantic {
        if by_id.contains_key(hit.id()) {
            continue;
        }
        let similarity = hit.semantic_similarity.unwrap_or(hit.score);
        hit.score = similarity * weights.semantic;
        by_id.insert(hit.id().to_string(), merged.len());
        merged.push(hit);
    }

    for hit in keyword {
        let keyword_similarity = hit.keyword_similarity.unwrap_or(hit.score);
        match by_id.get(hit.id()) {
            Some(&idx) => {
                let existing = &mut merged[idx];
                if existing.keyword_similarity.is_some() {
                    continue;
                }
                let semantic_similarity = existing.semantic_similarity.unwrap_or(0.0);
                existing.score = semantic_similarity * weights.semantic
                    + keyword_similarity * weights.keyword;
                existing.keyword_similarity = Some(keyword_similarity);
                existing.sources.extend(hit.sources);
                existing.memory = hit.memory;
            }
            None => {
                let mut hit = hit;
                hit.score = keyword_similarity * weights.keyword;
                by_id.insert(hit.id().to_string(), merged.len());
                merged.push(hit);
            }
        }
    }

    merged.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.memory.timestamp.cmp(&a.memory.timestamp))
    });
    merged.truncate(limit);
    merged
}
