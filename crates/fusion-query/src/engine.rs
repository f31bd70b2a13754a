//! Fusion entry point and the provider-facing search orchestrator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use fusion_core::{
    CandidateResult, FusedResult, FusionConfig, FusionError, FusionMethod, FusionResponse,
    FusionWeights, LexicalSearchProvider, Result, SearchConfig, Source, VectorSearchProvider,
};

use crate::assemble::{assemble, CandidatePool};
use crate::fusion::{reciprocal_rank_fusion, single_source, weighted_fusion};

/// Merge keyword results (relevance scores) and vector results (distances)
/// into one deduplicated ranking.
///
/// Pure and synchronous; `query` is only used for logging. Never fails on
/// data content: empty inputs, ties and non-finite scores all have a defined
/// outcome.
///
/// When one side is empty the other side's MinMax-normalized scores are used
/// directly as `hybrid_score`, whatever the configured method and weights.
pub fn fuse(
    query: &str,
    lexical: &[CandidateResult],
    vector: &[CandidateResult],
    config: &FusionConfig,
) -> Vec<FusedResult> {
    if lexical.is_empty() && vector.is_empty() {
        info!("Both keyword and vector results are empty for query: {:?}", query);
        return Vec::new();
    }

    let pool = CandidatePool::build(lexical, vector, config.attribute_precedence());

    if lexical.is_empty() || vector.is_empty() {
        let source = if lexical.is_empty() {
            Source::Semantic
        } else {
            Source::Keyword
        };
        info!(
            "Only {} results present for query {:?}, using them alone",
            source, query
        );
        let scores = single_source(&pool, source);
        return assemble(pool, scores, None, config.max_results());
    }

    info!(
        "Hybrid fusion for query {:?}: {} keyword results, {} vector results, method={}",
        query,
        lexical.len(),
        vector.len(),
        config.method()
    );

    let (scores, min_score) = match config.method() {
        FusionMethod::Weighted => (
            weighted_fusion(
                &pool,
                config.semantic_weight(),
                config.keyword_weight(),
                config.normalize_method(),
            ),
            Some(config.min_score_threshold()),
        ),
        // RRF scores live on their own scale; the threshold does not apply.
        FusionMethod::ReciprocalRankFusion => (reciprocal_rank_fusion(&pool, config.rrf_k()), None),
    };

    let candidates = pool.len();
    let results = assemble(pool, scores, min_score, config.max_results());

    debug!("Fused {} candidates to {} results", candidates, results.len());

    results
}

/// Hybrid search orchestrator.
///
/// Queries the keyword and vector providers concurrently, then fuses their
/// results with [`fuse`]. A provider that fails or times out is treated as
/// having returned nothing; the call only fails when both do.
pub struct HybridSearcher<L, V> {
    /// Keyword search backend.
    lexical: Arc<L>,

    /// Vector search backend.
    vector: Arc<V>,
}

impl<L, V> HybridSearcher<L, V>
where
    L: LexicalSearchProvider,
    V: VectorSearchProvider,
{
    /// Create a new searcher.
    pub fn new(lexical: Arc<L>, vector: Arc<V>) -> Self {
        Self { lexical, vector }
    }

    /// Run both providers and fuse their results.
    pub async fn search(
        &self,
        query: &str,
        fusion: &FusionConfig,
        search: &SearchConfig,
    ) -> Result<FusionResponse> {
        let start = Instant::now();

        info!("Searching for: {:?}", query);

        let fetch_k = search.fetch_limit();
        let timeout = Duration::from_millis(search.provider_timeout_ms);

        let (keyword_results, vector_results) = tokio::join!(
            self.keyword_search(query, fetch_k, timeout),
            self.vector_search(query, fetch_k, timeout)
        );

        let mut degraded = Vec::new();
        let (keyword_results, vector_results) = match (keyword_results, vector_results) {
            (Err(keyword_err), Err(vector_err)) => {
                return Err(FusionError::provider(
                    format!("{}+{}", self.lexical.name(), self.vector.name()),
                    format!("keyword: {}; vector: {}", keyword_err, vector_err),
                ));
            }
            (Ok(keyword), Ok(vector)) => (keyword, vector),
            (Err(e), Ok(vector)) => {
                warn!("Keyword search unavailable, falling back to vector-only fusion: {}", e);
                degraded.push(Source::Keyword);
                (Vec::new(), vector)
            }
            (Ok(keyword), Err(e)) => {
                warn!("Vector search unavailable, falling back to keyword-only fusion: {}", e);
                degraded.push(Source::Semantic);
                (keyword, Vec::new())
            }
        };

        debug!(
            "Keyword search returned {} results, vector search returned {} results",
            keyword_results.len(),
            vector_results.len()
        );

        let capped;
        let config = match fusion.max_results() {
            Some(_) => fusion,
            None => {
                capped = fusion.to_builder().max_results(Some(search.top_k)).build()?;
                &capped
            }
        };

        let results = fuse(query, &keyword_results, &vector_results, config);

        let latency_ms = start.elapsed().as_millis() as u64;

        info!(
            "Search completed in {}ms, returned {} results",
            latency_ms,
            results.len()
        );

        Ok(FusionResponse {
            query: query.to_string(),
            method: config.method(),
            weights: FusionWeights::from(config),
            total_results: results.len(),
            latency_ms,
            degraded,
            results,
        })
    }

    /// Perform keyword search under a timeout.
    async fn keyword_search(
        &self,
        query: &str,
        k: usize,
        timeout: Duration,
    ) -> Result<Vec<CandidateResult>> {
        let provider = self.lexical.name();
        match tokio::time::timeout(timeout, self.lexical.keyword_search(query, k)).await {
            Ok(results) => results,
            Err(_) => Err(timed_out(provider, timeout)),
        }
    }

    /// Perform vector search under a timeout.
    async fn vector_search(
        &self,
        query: &str,
        k: usize,
        timeout: Duration,
    ) -> Result<Vec<CandidateResult>> {
        let provider = self.vector.name();
        match tokio::time::timeout(timeout, self.vector.vector_search(query, k)).await {
            Ok(results) => results,
            Err(_) => Err(timed_out(provider, timeout)),
        }
    }
}

fn timed_out(provider: &str, timeout: Duration) -> FusionError {
    FusionError::Timeout {
        provider: provider.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fusion_core::StaticProvider;

    struct FailingProvider;

    #[async_trait]
    impl LexicalSearchProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn keyword_search(&self, _query: &str, _limit: usize) -> Result<Vec<CandidateResult>> {
            Err(FusionError::provider("failing", "connection refused"))
        }
    }

    #[async_trait]
    impl VectorSearchProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn vector_search(&self, _query: &str, _limit: usize) -> Result<Vec<CandidateResult>> {
            Err(FusionError::provider("failing", "collection missing"))
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl VectorSearchProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn vector_search(&self, _query: &str, _limit: usize) -> Result<Vec<CandidateResult>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![CandidateResult::new("late", 0.1)])
        }
    }

    fn keyword_fixture() -> Arc<StaticProvider> {
        Arc::new(StaticProvider::new(
            "es",
            vec![
                CandidateResult::new("e1", 15.2),
                CandidateResult::new("e2", 12.8),
                CandidateResult::new("e3", 8.5),
            ],
        ))
    }

    fn vector_fixture() -> Arc<StaticProvider> {
        Arc::new(StaticProvider::new(
            "chroma",
            vec![
                CandidateResult::new("e2", 0.12),
                CandidateResult::new("e4", 0.18),
                CandidateResult::new("e5", 0.25),
            ],
        ))
    }

    #[test]
    fn test_fuse_both_empty() {
        assert!(fuse("q", &[], &[], &FusionConfig::default()).is_empty());
    }

    #[test]
    fn test_single_source_ignores_method_and_threshold() {
        let config = FusionConfig::builder()
            .method(FusionMethod::ReciprocalRankFusion)
            .min_score_threshold(0.9)
            .build()
            .unwrap();
        let keyword = vec![CandidateResult::new("a", 2.0), CandidateResult::new("b", 4.0)];

        let results = fuse("q", &keyword, &[], &config);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "b");
        assert_eq!(results[0].hybrid_score, 1.0);
        assert_eq!(results[1].hybrid_score, 0.0);
        assert!(results.iter().all(|r| r.rrf_score.is_none()));
        assert!(results.iter().all(|r| r.semantic_norm_score == Some(0.0)));
        assert!(results.iter().all(|r| !r.source_flags.in_semantic));
    }

    #[tokio::test]
    async fn test_search_fuses_both_providers() {
        let searcher = HybridSearcher::new(keyword_fixture(), vector_fixture());

        let response = searcher
            .search("invoice", &FusionConfig::default(), &SearchConfig::default())
            .await
            .unwrap();

        assert_eq!(response.total_results, 5);
        assert_eq!(response.results[0].id, "e2");
        assert_eq!(response.method, FusionMethod::Weighted);
        assert_eq!(response.weights.semantic, 0.7);
        assert!(response.degraded.is_empty());
    }

    #[tokio::test]
    async fn test_search_caps_at_top_k() {
        let searcher = HybridSearcher::new(keyword_fixture(), vector_fixture());
        let search = SearchConfig {
            top_k: 2,
            ..SearchConfig::default()
        };

        let response = searcher
            .search("invoice", &FusionConfig::default(), &search)
            .await
            .unwrap();
        assert_eq!(response.total_results, 2);

        // An explicit fusion cap wins over top_k.
        let fusion = FusionConfig::builder().max_results(Some(4)).build().unwrap();
        let response = searcher.search("invoice", &fusion, &search).await.unwrap();
        assert_eq!(response.total_results, 4);
    }

    #[tokio::test]
    async fn test_zero_top_k_returns_everything() {
        let searcher = HybridSearcher::new(keyword_fixture(), vector_fixture());
        let search = SearchConfig {
            top_k: 0,
            ..SearchConfig::default()
        };

        let response = searcher
            .search("invoice", &FusionConfig::default(), &search)
            .await
            .unwrap();
        assert_eq!(response.total_results, 5);
        assert_eq!(response.results.len(), 5);
    }

    #[tokio::test]
    async fn test_search_degrades_when_one_provider_fails() {
        let searcher = HybridSearcher::new(Arc::new(FailingProvider), vector_fixture());

        let response = searcher
            .search("invoice", &FusionConfig::default(), &SearchConfig::default())
            .await
            .unwrap();

        assert_eq!(response.degraded, vec![Source::Keyword]);
        assert_eq!(response.total_results, 3);
        assert_eq!(response.results[0].id, "e2");
        assert_eq!(response.results[0].hybrid_score, 1.0);
    }

    #[tokio::test]
    async fn test_search_fails_when_both_providers_fail() {
        let searcher = HybridSearcher::new(Arc::new(FailingProvider), Arc::new(FailingProvider));

        let err = searcher
            .search("invoice", &FusionConfig::default(), &SearchConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "PROVIDER_ERROR");
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_search_times_out_slow_provider() {
        let searcher = HybridSearcher::new(keyword_fixture(), Arc::new(SlowProvider));
        let search = SearchConfig {
            provider_timeout_ms: 20,
            ..SearchConfig::default()
        };

        let response = searcher
            .search("invoice", &FusionConfig::default(), &search)
            .await
            .unwrap();

        assert_eq!(response.degraded, vec![Source::Semantic]);
        assert_eq!(response.results[0].id, "e1");
        assert!(response.results.iter().all(|r| r.id != "late"));
    }
}
