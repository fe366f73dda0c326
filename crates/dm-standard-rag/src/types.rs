//! Core retrieval types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default similarity threshold; candidates below it are discarded.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.3;

/// Default number of results kept per query.
pub const DEFAULT_K_PER_QUERY: usize = 3;

/// Retrieval-time metadata category narrowing similarity search before
/// scoring. Table/column names, API paths and domain terminology are
/// distinct standard types and must not bleed into each other's matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardCategory {
    TableName,
    ColumnName,
    ApiPath,
    Terminology,
}

impl StandardCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardCategory::TableName => "table_name",
            StandardCategory::ColumnName => "column_name",
            StandardCategory::ApiPath => "api_path",
            StandardCategory::Terminology => "terminology",
        }
    }

    /// The document type each category lives under, used as the second leg
    /// of the AND metadata filter.
    pub fn standard_type(&self) -> StandardType {
        match self {
            StandardCategory::TableName | StandardCategory::ColumnName => {
                StandardType::DatabaseStandard
            }
            StandardCategory::ApiPath => StandardType::ApiStandard,
            StandardCategory::Terminology => StandardType::TerminologyStandard,
        }
    }
}

impl fmt::Display for StandardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-document type of an indexed standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardType {
    DatabaseStandard,
    ApiStandard,
    TerminologyStandard,
}

impl StandardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardType::DatabaseStandard => "database_standard",
            StandardType::ApiStandard => "api_standard",
            StandardType::TerminologyStandard => "terminology_standard",
        }
    }
}

impl fmt::Display for StandardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieval unit: what to look for, and in which standard category.
///
/// The query text is the short display name only; the category travels
/// out-of-band as a metadata filter and is never concatenated into the
/// query string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardQuery {
    pub raw_name: String,
    pub category: StandardCategory,
    pub domain_hint: Option<String>,
}

impl StandardQuery {
    pub fn new(
        raw_name: impl Into<String>,
        category: StandardCategory,
        domain_hint: Option<String>,
    ) -> Self {
        Self {
            raw_name: raw_name.into(),
            category,
            domain_hint,
        }
    }
}

/// A retrieved standard snippet, read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardSearchResult {
    /// Natural-language body, suitable for a generative prompt.
    pub text: String,
    /// Document type as recorded in index metadata.
    pub standard_type: String,
    /// Category as recorded in index metadata.
    pub category: String,
    /// Row records attached by the indexer; object, array, or a JSON string
    /// of either. Parsed (tolerantly) by the mapping context builder.
    pub structured_data: serde_json::Value,
    pub score: f32,
}

/// Retriever tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub k_per_query: usize,
    pub score_threshold: f32,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            k_per_query: DEFAULT_K_PER_QUERY,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

/// Retrieval errors. An empty index is NOT an error - collaborators return
/// an empty result set for that.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("similarity search failed: {0}")]
    Search(String),

    #[error("search backend unavailable: {0}")]
    Unavailable(String),
}
