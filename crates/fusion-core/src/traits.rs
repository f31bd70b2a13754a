//! Traits for the external search providers feeding the fusion engine.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::CandidateResult;

/// Lexical/keyword search backend (BM25 or similar).
///
/// Returned candidates carry a relevance score in `raw_score` (higher is
/// better) and are ordered best-first.
#[async_trait]
pub trait LexicalSearchProvider: Send + Sync {
    /// Provider name used in logs and degradation reports.
    fn name(&self) -> &str;

    /// Run a keyword query returning at most `limit` candidates.
    async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<CandidateResult>>;
}

/// Vector similarity search backend.
///
/// Returned candidates carry a distance in `raw_score` (lower is better) and
/// are ordered best-first. Embedding the query is the provider's concern.
#[async_trait]
pub trait VectorSearchProvider: Send + Sync {
    /// Provider name used in logs and degradation reports.
    fn name(&self) -> &str;

    /// Run a similarity query returning at most `limit` candidates.
    async fn vector_search(&self, query: &str, limit: usize) -> Result<Vec<CandidateResult>>;
}

/// Fixed in-memory result list, usable as either provider.
///
/// Handy for callers that already hold both result sets and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    name: String,
    results: Vec<CandidateResult>,
}

impl StaticProvider {
    /// Create a provider that always returns `results` (truncated to the limit).
    pub fn new(name: impl Into<String>, results: Vec<CandidateResult>) -> Self {
        Self {
            name: name.into(),
            results,
        }
    }

    fn take(&self, limit: usize) -> Vec<CandidateResult> {
        self.results.iter().take(limit).cloned().collect()
    }
}

#[async_trait]
impl LexicalSearchProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn keyword_search(&self, _query: &str, limit: usize) -> Result<Vec<CandidateResult>> {
        Ok(self.take(limit))
    }
}

#[async_trait]
impl VectorSearchProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn vector_search(&self, _query: &str, limit: usize) -> Result<Vec<CandidateResult>> {
        Ok(self.take(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_respects_limit() {
        let provider = StaticProvider::new(
            "fixture",
            vec![
                CandidateResult::new("a", 3.0),
                CandidateResult::new("b", 2.0),
                CandidateResult::new("c", 1.0),
            ],
        );

        let hits = provider.keyword_search("anything", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");

        let hits = VectorSearchProvider::vector_search(&provider, "anything", 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(LexicalSearchProvider::name(&provider), "fixture");
    }
}
