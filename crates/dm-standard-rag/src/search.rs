//! The similarity-search collaborator seam.
//!
//! Embedding generation, vector storage and ANN query execution all live
//! behind this trait. The pipeline only ever sees scored documents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{RagError, StandardCategory, StandardType};

/// Metadata conjunction applied before similarity scoring. `None` legs
/// match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub standard_type: Option<StandardType>,
    pub category: Option<StandardCategory>,
}

impl SearchFilter {
    /// The AND-filter for one query category: {type, category}.
    pub fn for_category(category: StandardCategory) -> Self {
        Self {
            standard_type: Some(category.standard_type()),
            category: Some(category),
        }
    }
}

/// One hit from the similarity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub text: String,
    /// Index metadata: `type`, `category`, `structured_data`, and
    /// optionally `has_draft_context` / `transformation_session_id`.
    pub metadata: serde_json::Value,
    /// Similarity in [0, 1].
    pub score: f32,
}

/// Opaque nearest-neighbor search over indexed standard documents.
///
/// An absent index or zero matching documents is a valid empty result, not
/// an error.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn search(
        &self,
        query_text: &str,
        filter: &SearchFilter,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, RagError>;
}
