//! In-process lexical standard index.
//!
//! A small token-overlap / Jaro-Winkler scorer over documents held in
//! memory. Used by tests and local development where the production vector
//! index is not available; it honors the same filter and threshold contract
//! as the real collaborator.

use async_trait::async_trait;
use serde_json::{json, Value};
use strsim::jaro_winkler;

use crate::search::{ScoredDocument, SearchFilter, SimilaritySearch};
use crate::types::{RagError, StandardCategory, StandardType};

#[derive(Debug, Clone)]
struct IndexedDocument {
    text: String,
    metadata: Value,
}

/// Lexical stand-in for the external similarity-search collaborator.
#[derive(Debug, Clone, Default)]
pub struct LexicalStandardIndex {
    documents: Vec<IndexedDocument>,
}

impl LexicalStandardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one standard snippet with the usual metadata legs.
    pub fn add_standard(
        &mut self,
        text: impl Into<String>,
        standard_type: StandardType,
        category: StandardCategory,
        structured_data: Value,
    ) {
        let metadata = json!({
            "type": standard_type.as_str(),
            "category": category.as_str(),
            "structured_data": structured_data,
        });
        self.push_raw(text, metadata);
    }

    /// Index a document with caller-supplied metadata (session markers etc.).
    pub fn push_raw(&mut self, text: impl Into<String>, metadata: Value) {
        self.documents.push(IndexedDocument {
            text: text.into(),
            metadata,
        });
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn matches_filter(metadata: &Value, filter: &SearchFilter) -> bool {
        let leg = |key: &str, expected: Option<&str>| match expected {
            Some(expected) => metadata.get(key).and_then(Value::as_str) == Some(expected),
            None => true,
        };
        leg("type", filter.standard_type.map(|t| t.as_str()))
            && leg("category", filter.category.map(|c| c.as_str()))
    }

    /// Token overlap blended with the best per-token Jaro-Winkler match.
    /// Fuzzy credit only kicks in above 0.85 so unrelated tokens do not
    /// creep over the retrieval threshold.
    fn score(query: &str, text: &str) -> f32 {
        let query = query.to_lowercase();
        let text = text.to_lowercase();
        let query_tokens: Vec<&str> = query.split_whitespace().collect();
        let text_tokens: Vec<&str> = text.split_whitespace().collect();
        if query_tokens.is_empty() || text_tokens.is_empty() {
            return 0.0;
        }

        let common = query_tokens
            .iter()
            .filter(|token| text_tokens.contains(token))
            .count();
        let overlap = common as f64 / (query_tokens.len() + text_tokens.len()) as f64 * 2.0;

        let best_fuzzy = text_tokens
            .iter()
            .map(|token| jaro_winkler(&query, token))
            .fold(0.0f64, f64::max);
        let fuzzy = if best_fuzzy >= 0.85 { best_fuzzy } else { 0.0 };

        overlap.max(fuzzy) as f32
    }
}

#[async_trait]
impl SimilaritySearch for LexicalStandardIndex {
    async fn search(
        &self,
        query_text: &str,
        filter: &SearchFilter,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let mut hits: Vec<ScoredDocument> = self
            .documents
            .iter()
            .filter(|doc| Self::matches_filter(&doc.metadata, filter))
            .filter_map(|doc| {
                let score = Self::score(query_text, &doc.text);
                (score >= min_score).then(|| ScoredDocument {
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_index() -> LexicalStandardIndex {
        let mut index = LexicalStandardIndex::new();
        index.add_standard(
            "주문정보 Order m_odr는 ODR 도메인의 table_name이다",
            StandardType::DatabaseStandard,
            StandardCategory::TableName,
            json!({"entity_name": "Order", "table_name": "T_ODR_M"}),
        );
        index.add_standard(
            "쿠폰정보 Coupon m_cpn는 CPN 도메인의 table_name이다",
            StandardType::DatabaseStandard,
            StandardCategory::TableName,
            json!({"entity_name": "Coupon", "table_name": "T_CPN_M"}),
        );
        index
    }

    #[tokio::test]
    async fn exact_token_match_scores_high() {
        let index = order_index();
        let filter = SearchFilter::for_category(StandardCategory::TableName);
        let hits = index.search("Order", &filter, 3, 0.3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score > 0.9);
        assert!(hits[0].text.contains("m_odr"));
    }

    #[tokio::test]
    async fn filter_mismatch_yields_empty_result() {
        let index = order_index();
        let filter = SearchFilter::for_category(StandardCategory::ApiPath);
        let hits = index.search("Order", &filter, 3, 0.3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn empty_index_is_a_valid_empty_result() {
        let index = LexicalStandardIndex::new();
        let filter = SearchFilter::default();
        let hits = index.search("Order", &filter, 3, 0.3).await.unwrap();
        assert!(hits.is_empty());
    }
}
