//! Fusion strategies: weighted linear fusion and Reciprocal Rank Fusion (RRF).
//!
//! Each strategy scores every entry of a [`CandidatePool`] and returns one
//! [`FusionScore`] per entry, index-aligned with `pool.entries()`.

use fusion_core::{NormalizeMethod, Source};

use crate::assemble::CandidatePool;
use crate::normalize::{distance_to_similarity, normalize};

/// Per-candidate fusion output.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FusionScore {
    /// Final ranking key.
    pub hybrid: f64,

    /// Normalized keyword score (weighted and single-source paths).
    pub keyword_norm: Option<f64>,

    /// Normalized semantic score (weighted and single-source paths).
    pub semantic_norm: Option<f64>,

    /// Sum of reciprocal rank contributions (RRF only).
    pub rrf: Option<f64>,
}

/// Contribution of one list position to an RRF score: `1 / (k + rank)`.
///
/// `rank` is 1-based.
pub fn rrf_contribution(k: u32, rank: usize) -> f64 {
    1.0 / (f64::from(k) + rank as f64)
}

/// Reciprocal Rank Fusion.
///
/// `score(d) = Σ 1 / (k + rank_i(d))` over the sources containing `d`, where
/// rank is the provider's own order. Raw scores are not consulted.
pub fn reciprocal_rank_fusion(pool: &CandidatePool, k: u32) -> Vec<FusionScore> {
    pool.entries()
        .iter()
        .map(|entry| {
            let rrf: f64 = [entry.keyword, entry.semantic]
                .into_iter()
                .flatten()
                .map(|hit| rrf_contribution(k, hit.rank))
                .sum();

            FusionScore {
                hybrid: rrf,
                keyword_norm: None,
                semantic_norm: None,
                rrf: Some(rrf),
            }
        })
        .collect()
}

/// Weighted linear fusion of normalized scores.
///
/// Each source is normalized over its own list, then
/// `hybrid = semantic_weight * semantic_norm + keyword_weight * keyword_norm`.
/// Absence from a source counts as a normalized score of 0.0.
pub fn weighted_fusion(
    pool: &CandidatePool,
    semantic_weight: f64,
    keyword_weight: f64,
    method: NormalizeMethod,
) -> Vec<FusionScore> {
    let keyword = source_norms(pool, Source::Keyword, method);
    let semantic = source_norms(pool, Source::Semantic, method);

    keyword
        .into_iter()
        .zip(semantic)
        .map(|(kw, sem)| {
            let kw = kw.unwrap_or(0.0);
            let sem = sem.unwrap_or(0.0);
            FusionScore {
                hybrid: semantic_weight * sem + keyword_weight * kw,
                keyword_norm: Some(kw),
                semantic_norm: Some(sem),
                rrf: None,
            }
        })
        .collect()
}

/// Score a pool populated by one source only.
///
/// The MinMax-normalized score is used directly as `hybrid`; no weights are
/// applied. The other source's normalized score is reported as 0.0.
pub fn single_source(pool: &CandidatePool, source: Source) -> Vec<FusionScore> {
    source_norms(pool, source, NormalizeMethod::MinMax)
        .into_iter()
        .map(|norm| {
            let norm = norm.unwrap_or(0.0);
            let (keyword_norm, semantic_norm) = match source {
                Source::Keyword => (norm, 0.0),
                Source::Semantic => (0.0, norm),
            };
            FusionScore {
                hybrid: norm,
                keyword_norm: Some(keyword_norm),
                semantic_norm: Some(semantic_norm),
                rrf: None,
            }
        })
        .collect()
}

/// Normalized score of every pool entry for `source`; `None` where absent.
///
/// Vector distances are converted to similarities before normalization.
fn source_norms(pool: &CandidatePool, source: Source, method: NormalizeMethod) -> Vec<Option<f64>> {
    let order = pool.order(source);
    let entries = pool.entries();

    let raw: Vec<f64> = order
        .iter()
        .filter_map(|&idx| entries[idx].hit(source))
        .map(|hit| match source {
            Source::Keyword => hit.raw_score,
            Source::Semantic => distance_to_similarity(hit.raw_score),
        })
        .collect();

    let mut norms = vec![None; pool.len()];
    for (&idx, norm) in order.iter().zip(normalize(&raw, method)) {
        norms[idx] = Some(norm);
    }
    norms
}
