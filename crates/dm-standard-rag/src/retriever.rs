//! Categorized retrieval with per-query fault isolation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::search::{ScoredDocument, SearchFilter, SimilaritySearch};
use crate::types::{RetrieverConfig, StandardQuery, StandardSearchResult};

/// Aggregate retrieval counters, reported for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub unique_results: usize,
}

/// De-duplicated results plus the counters of the batch that produced them.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    pub results: Vec<StandardSearchResult>,
    pub stats: RetrievalStats,
}

/// Issues category-scoped queries against the similarity-search
/// collaborator and aggregates the hits.
///
/// A query that errors or comes back empty contributes nothing and never
/// aborts the batch; the stats record what happened.
pub struct CategorizedRetriever {
    search: Arc<dyn SimilaritySearch>,
    config: RetrieverConfig,
}

impl CategorizedRetriever {
    pub fn new(search: Arc<dyn SimilaritySearch>, config: RetrieverConfig) -> Self {
        Self { search, config }
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Run the whole query batch. Results are de-duplicated by SHA-256
    /// content fingerprint; duplicates from different queries are merged
    /// keeping the highest similarity score, in first-appearance order.
    #[instrument(skip(self, queries), fields(query_count = queries.len()))]
    pub async fn retrieve(
        &self,
        queries: &[StandardQuery],
        session_id: Option<&str>,
    ) -> RetrievalOutcome {
        let mut stats = RetrievalStats::default();
        let mut order: Vec<String> = Vec::new();
        let mut by_fingerprint: HashMap<String, StandardSearchResult> = HashMap::new();

        for query in queries {
            stats.attempted += 1;
            let filter = SearchFilter::for_category(query.category);
            let hits = self
                .search
                .search(
                    &query.raw_name,
                    &filter,
                    self.config.k_per_query,
                    self.config.score_threshold,
                )
                .await;

            let hits = match hits {
                Ok(hits) => {
                    stats.succeeded += 1;
                    hits
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(query = %query.raw_name, category = %query.category, error = %e,
                          "standard query failed, continuing batch");
                    continue;
                }
            };

            for hit in hits {
                if hit.score < self.config.score_threshold {
                    continue;
                }
                if !session_allows(&hit.metadata, session_id) {
                    continue;
                }
                let result = to_search_result(hit, query);
                let fingerprint = content_fingerprint(&result.text);
                match by_fingerprint.get_mut(&fingerprint) {
                    Some(existing) => {
                        if result.score > existing.score {
                            existing.score = result.score;
                        }
                    }
                    None => {
                        order.push(fingerprint.clone());
                        by_fingerprint.insert(fingerprint, result);
                    }
                }
            }
        }

        let results: Vec<StandardSearchResult> = order
            .into_iter()
            .filter_map(|fp| by_fingerprint.remove(&fp))
            .collect();
        stats.unique_results = results.len();
        debug!(
            attempted = stats.attempted,
            succeeded = stats.succeeded,
            failed = stats.failed,
            unique = stats.unique_results,
            "retrieval batch done"
        );

        RetrievalOutcome { results, stats }
    }
}

/// Documents that carry draft context belong to one transformation session;
/// only the caller's own pass the filter. Base standard documents (no
/// marker) always pass.
fn session_allows(metadata: &serde_json::Value, session_id: Option<&str>) -> bool {
    let has_draft_context = metadata
        .get("has_draft_context")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    if !has_draft_context {
        return true;
    }
    let doc_session = metadata
        .get("transformation_session_id")
        .and_then(serde_json::Value::as_str);
    matches!((doc_session, session_id), (Some(doc), Some(caller)) if doc == caller)
}

fn to_search_result(hit: ScoredDocument, query: &StandardQuery) -> StandardSearchResult {
    let standard_type = hit
        .metadata
        .get("type")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| query.category.standard_type().as_str().to_string());
    let category = hit
        .metadata
        .get("category")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| query.category.as_str().to_string());
    let structured_data = hit
        .metadata
        .get("structured_data")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    StandardSearchResult {
        text: hit.text,
        standard_type,
        category,
        structured_data,
        score: hit.score,
    }
}

fn content_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
