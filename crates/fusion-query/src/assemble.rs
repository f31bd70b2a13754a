//! Candidate deduplication and final result assembly.
//!
//! [`CandidatePool`] unions both provider lists in first-encounter order
//! (keyword list first, then vector list). That order is the tie-break for
//! equal scores, so output never depends on hash-map iteration.

use std::collections::HashMap;

use tracing::{debug, warn};

use fusion_core::record::{DEFAULT_DISTANCE, DEFAULT_KEYWORD_SCORE};
use fusion_core::{
    AttributePrecedence, Attributes, CandidateResult, FusedResult, Source, SourceFlags,
};

use crate::fusion::FusionScore;

/// A candidate's position and raw score within one provider list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceHit {
    /// 1-based position in the provider list.
    pub rank: usize,

    /// Relevance (keyword) or distance (vector), always finite.
    pub raw_score: f64,
}

/// One deduplicated candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub id: String,
    pub attributes: Attributes,
    pub keyword: Option<SourceHit>,
    pub semantic: Option<SourceHit>,
}

impl PoolEntry {
    /// The hit for the given source, if the candidate was found there.
    pub fn hit(&self, source: Source) -> Option<SourceHit> {
        match source {
            Source::Keyword => self.keyword,
            Source::Semantic => self.semantic,
        }
    }

    pub fn source_flags(&self) -> SourceFlags {
        SourceFlags {
            in_keyword: self.keyword.is_some(),
            in_semantic: self.semantic.is_some(),
        }
    }
}

/// Union of both provider lists keyed by id.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    entries: Vec<PoolEntry>,
    index: HashMap<String, usize>,
    keyword_order: Vec<usize>,
    semantic_order: Vec<usize>,
}

impl CandidatePool {
    /// Merge keyword candidates (relevance scores) and vector candidates
    /// (distances) into one pool.
    ///
    /// Repeated ids within one list keep their first occurrence.
    pub fn build(
        keyword: &[CandidateResult],
        semantic: &[CandidateResult],
        precedence: AttributePrecedence,
    ) -> Self {
        let mut pool = Self {
            entries: Vec::with_capacity(keyword.len() + semantic.len()),
            index: HashMap::with_capacity(keyword.len() + semantic.len()),
            keyword_order: Vec::with_capacity(keyword.len()),
            semantic_order: Vec::with_capacity(semantic.len()),
        };

        for (position, candidate) in keyword.iter().enumerate() {
            pool.insert(Source::Keyword, position + 1, candidate, precedence);
        }
        for (position, candidate) in semantic.iter().enumerate() {
            pool.insert(Source::Semantic, position + 1, candidate, precedence);
        }

        debug!(
            "Candidate pool: {} unique ids ({} keyword, {} semantic)",
            pool.entries.len(),
            pool.keyword_order.len(),
            pool.semantic_order.len()
        );

        pool
    }

    fn insert(
        &mut self,
        source: Source,
        rank: usize,
        candidate: &CandidateResult,
        precedence: AttributePrecedence,
    ) {
        let hit = SourceHit {
            rank,
            raw_score: sanitize_score(source, candidate),
        };

        let idx = match self.index.get(&candidate.id) {
            Some(&idx) => {
                let entry = &mut self.entries[idx];
                if entry.hit(source).is_some() {
                    warn!(
                        "Duplicate id {} at {} rank {}; keeping first occurrence",
                        candidate.id, source, rank
                    );
                    return;
                }
                merge_attributes(
                    &mut entry.attributes,
                    &candidate.attributes,
                    source,
                    precedence,
                );
                idx
            }
            None => {
                let idx = self.entries.len();
                self.entries.push(PoolEntry {
                    id: candidate.id.clone(),
                    attributes: candidate.attributes.clone(),
                    keyword: None,
                    semantic: None,
                });
                self.index.insert(candidate.id.clone(), idx);
                idx
            }
        };

        let entry = &mut self.entries[idx];
        match source {
            Source::Keyword => {
                entry.keyword = Some(hit);
                self.keyword_order.push(idx);
            }
            Source::Semantic => {
                entry.semantic = Some(hit);
                self.semantic_order.push(idx);
            }
        }
    }

    /// Entries in first-encounter order.
    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry indices found in `source`, in provider rank order.
    pub fn order(&self, source: Source) -> &[usize] {
        match source {
            Source::Keyword => &self.keyword_order,
            Source::Semantic => &self.semantic_order,
        }
    }

    /// Number of distinct ids contributed by `source`.
    pub fn source_len(&self, source: Source) -> usize {
        self.order(source).len()
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &str) -> Option<&PoolEntry> {
        self.index.get(id).map(|&idx| &self.entries[idx])
    }
}

fn sanitize_score(source: Source, candidate: &CandidateResult) -> f64 {
    if candidate.raw_score.is_finite() {
        return candidate.raw_score;
    }

    let fallback = match source {
        Source::Keyword => DEFAULT_KEYWORD_SCORE,
        Source::Semantic => DEFAULT_DISTANCE,
    };
    warn!(
        "Non-finite {} score {} for {}; using {}",
        source, candidate.raw_score, candidate.id, fallback
    );
    fallback
}

/// Fold `incoming` attributes from `source` into `base`.
fn merge_attributes(
    base: &mut Attributes,
    incoming: &Attributes,
    source: Source,
    precedence: AttributePrecedence,
) {
    let incoming_wins = matches!(
        (source, precedence),
        (Source::Semantic, AttributePrecedence::Semantic)
            | (Source::Keyword, AttributePrecedence::Keyword)
    );

    for (key, value) in incoming {
        if incoming_wins || !base.contains_key(key) {
            base.insert(key.clone(), value.clone());
        }
    }
}

/// Turn scored pool entries into the final ranked list.
///
/// `scores` is index-aligned with `pool.entries()`. Results below
/// `min_score` are dropped, the rest are stable-sorted by `hybrid_score`
/// descending and capped at `max_results`.
pub fn assemble(
    pool: CandidatePool,
    scores: Vec<FusionScore>,
    min_score: Option<f64>,
    max_results: Option<usize>,
) -> Vec<FusedResult> {
    debug_assert_eq!(pool.len(), scores.len());

    let mut results: Vec<FusedResult> = pool
        .entries
        .into_iter()
        .zip(scores)
        .filter(|(_, score)| min_score.map_or(true, |floor| score.hybrid >= floor))
        .map(|(entry, score)| FusedResult {
            rank: 0,
            source_flags: entry.source_flags(),
            keyword_rank: entry.keyword.map(|h| h.rank),
            semantic_rank: entry.semantic.map(|h| h.rank),
            id: entry.id,
            hybrid_score: score.hybrid,
            keyword_norm_score: score.keyword_norm,
            semantic_norm_score: score.semantic_norm,
            rrf_score: score.rrf,
            attributes: entry.attributes,
        })
        .collect();

    // Stable: equal scores keep first-encounter order.
    results.sort_by(|a, b| b.hybrid_score.total_cmp(&a.hybrid_score));

    if let Some(max) = max_results {
        results.truncate(max);
    }

    for (i, result) in results.iter_mut().enumerate() {
        result.rank = i + 1;
    }

    results
}
