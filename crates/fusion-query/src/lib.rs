//! fusion-query - Hybrid result fusion engine
//!
//! This crate merges a keyword (BM25) result list and a vector (distance)
//! result list into one deduplicated ranking.
//!
//! # Features
//!
//! - Min-max and z-score/sigmoid score normalization
//! - Weighted linear fusion of normalized scores
//! - Reciprocal Rank Fusion as a scale-free alternative
//! - Deterministic tie-breaking and attribute merging
//! - Concurrent provider fan-out with graceful degradation
//!
//! # Example
//!
//! ```rust
//! use fusion_core::{CandidateResult, FusionConfig};
//! use fusion_query::fuse;
//!
//! let keyword = vec![CandidateResult::new("e1", 15.2), CandidateResult::new("e2", 12.8)];
//! let vector = vec![CandidateResult::new("e2", 0.12), CandidateResult::new("e4", 0.18)];
//!
//! let results = fuse("invoice payment", &keyword, &vector, &FusionConfig::default());
//! assert_eq!(results[0].id, "e2");
//! ```

mod assemble;
mod engine;
mod fusion;
pub mod normalize;

pub use assemble::{assemble, CandidatePool, PoolEntry, SourceHit};
pub use engine::{fuse, HybridSearcher};
pub use fusion::{
    reciprocal_rank_fusion, rrf_contribution, single_source, weighted_fusion, FusionScore,
};

// Re-export for convenience
pub use fusion_core::{
    CandidateResult, FusedResult, FusionConfig, FusionMethod, FusionResponse, NormalizeMethod,
    SourceFlags,
};
