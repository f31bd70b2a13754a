//! Core domain types for hybrid result fusion.

use serde::{Deserialize, Serialize};

use crate::config::{FusionConfig, FusionMethod};

/// Passthrough fields carried from provider records into fused results.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Which provider a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Lexical/keyword search (BM25 relevance, higher is better).
    Keyword,
    /// Vector similarity search (distance, lower is better).
    Semantic,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Keyword => "keyword",
            Self::Semantic => "semantic",
        };
        write!(f, "{}", s)
    }
}

/// One item contributed by a search provider.
///
/// `raw_score` is a relevance score when the candidate sits in a keyword list
/// and a distance when it sits in a vector list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Identifier of the underlying item.
    pub id: String,

    /// Relevance (keyword) or distance (vector) as reported by the provider.
    pub raw_score: f64,

    /// Arbitrary passthrough fields (subject, sender, snippet, ...).
    #[serde(default)]
    pub attributes: Attributes,
}

impl CandidateResult {
    /// Create a candidate without attributes.
    pub fn new(id: impl Into<String>, raw_score: f64) -> Self {
        Self {
            id: id.into(),
            raw_score,
            attributes: Attributes::new(),
        }
    }

    /// Attach a passthrough attribute.
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Which sources an output item was found in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFlags {
    pub in_keyword: bool,
    pub in_semantic: bool,
}

impl SourceFlags {
    /// Found by both providers.
    pub fn in_both(&self) -> bool {
        self.in_keyword && self.in_semantic
    }
}

/// A deduplicated, scored output item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    /// Position in the final ranking (1-indexed).
    pub rank: usize,

    /// Identifier of the underlying item.
    pub id: String,

    /// Final ranking key.
    pub hybrid_score: f64,

    /// Normalized keyword score; 0.0 when absent from the keyword list.
    /// `None` under RRF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_norm_score: Option<f64>,

    /// Normalized semantic score; 0.0 when absent from the vector list.
    /// `None` under RRF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_norm_score: Option<f64>,

    /// Reciprocal rank fusion score. RRF only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrf_score: Option<f64>,

    /// Position in the keyword provider list (1-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_rank: Option<usize>,

    /// Position in the vector provider list (1-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_rank: Option<usize>,

    pub source_flags: SourceFlags,

    /// Merged passthrough attributes.
    #[serde(default)]
    pub attributes: Attributes,
}

/// Weights reported alongside a response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub semantic: f64,
    pub keyword: f64,
}

impl From<&FusionConfig> for FusionWeights {
    fn from(config: &FusionConfig) -> Self {
        Self {
            semantic: config.semantic_weight(),
            keyword: config.keyword_weight(),
        }
    }
}

/// Fused results container returned by the search orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResponse {
    /// The original query.
    pub query: String,

    /// Fusion method used.
    pub method: FusionMethod,

    /// Configured weights.
    pub weights: FusionWeights,

    /// Total results returned.
    pub total_results: usize,

    /// End-to-end latency in milliseconds.
    pub latency_ms: u64,

    /// Providers that failed or timed out and were treated as empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Source>,

    /// Individual results.
    pub results: Vec<FusedResult>,
}
