//! Domain-model draft standardization pipeline.
//!
//! Takes an auto-generated domain-model draft (aggregates, enumerations,
//! value objects, fields) and rewrites its names to conform to the company
//! naming standard, using retrieval-augmented generation:
//!
//! ```text
//! Draft
//!   │  extract_names           aggregates / enums / value objects
//!   ▼
//! build_queries                category-scoped, deterministic order
//!   ▼
//! CategorizedRetriever         AND {type, category}, top-k ≥ threshold
//!   ▼
//! StandardMappingContext       entity→table, name→domain (per session)
//!   ▼
//! apply_deterministic_mappings exact/normalized hits, no LLM involved
//!   ▼
//! strip_refs ─► ChunkedTransformer ─► restore_refs
//!               (token-budgeted chunks, sequential generative calls,
//!                fallback-to-original on failure)
//!   ▼
//! JobOutput                    same cardinality, refs conserved, anomalies
//! ```
//!
//! The similarity index, the LLM and the progress transport stay behind
//! traits ([`dm_standard_rag::SimilaritySearch`], [`dm_agentic::LlmClient`],
//! [`ProgressReporter`]); the pipeline owns everything in between.

pub mod config;
pub mod error;
pub mod extract;
pub mod job;
pub mod mapper;
pub mod progress;
pub mod query;
pub mod transform;

pub use config::{StandardizerConfig, TransformerConfig};
pub use error::{Result, StandardizerError};
pub use extract::extract_names;
pub use job::{Anomaly, DraftStandardizer, JobInput, JobOutput, JobStatus};
pub use mapper::apply_deterministic_mappings;
pub use progress::{
    NoopProgressReporter, ProgressEvent, ProgressReporter, ProgressScope, ProgressStatus,
    TracingProgressReporter,
};
pub use query::build_queries;
pub use transform::{CancellationFlag, ChunkedTransformer, TransformReport, TransformScope};

// Re-export the collaborator seams so downstream callers need only this
// crate for wiring.
pub use dm_agentic::{AgentBackend, AgenticError, LlmClient};
pub use dm_draft_types::{BoundedContext, Draft, DraftError, PropertyType, StructureItem};
pub use dm_standard_rag::{
    LexicalStandardIndex, RagError, RetrieverConfig, SimilaritySearch, StandardCategory,
};
