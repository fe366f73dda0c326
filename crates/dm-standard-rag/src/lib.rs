//! Standard retrieval
//!
//! Company naming standards (DB table names, column names, API paths, domain
//! terminology) are indexed in an external similarity-search store. This
//! crate narrows the search space by category metadata first, then runs
//! nearest-neighbor search inside it, and consolidates the hits into a
//! per-job mapping context.
//!
//! # Architecture
//!
//! ```text
//! StandardQuery ("Order", table_name)
//!       │
//!       ▼
//! ┌──────────────────────────────────────────┐
//! │  SimilaritySearch (external collaborator)│
//! │  AND-filter {type, category}             │
//! │  → top-k candidates ≥ threshold (0.3)    │
//! └──────────────────────────────────────────┘
//!       │
//!       ▼
//! ┌──────────────────────────────────────────┐
//! │  CategorizedRetriever                    │
//! │  per-query fault isolation + counters    │
//! │  SHA-256 dedup, keep highest score       │
//! └──────────────────────────────────────────┘
//!       │
//!       ▼
//! ┌──────────────────────────────────────────┐
//! │  StandardMappingContext (session-scoped) │
//! │  entity→table, name→domain, O(1) lookups │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The vector index itself (embeddings, storage, ANN execution) stays behind
//! the [`SimilaritySearch`] trait; [`LexicalStandardIndex`] is an in-process
//! stand-in for tests and local development only.

pub mod context;
pub mod lexical;
pub mod retriever;
pub mod search;
pub mod types;

pub use context::{MappingContextBuilder, StandardMappingContext};
pub use lexical::LexicalStandardIndex;
pub use retriever::{CategorizedRetriever, RetrievalOutcome, RetrievalStats};
pub use search::{ScoredDocument, SearchFilter, SimilaritySearch};
pub use types::{
    RagError, RetrieverConfig, StandardCategory, StandardQuery, StandardSearchResult, StandardType,
};
