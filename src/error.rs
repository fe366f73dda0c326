//! Pipeline error taxonomy.
//!
//! Most failures are absorbed as anomalies (retrieval misses,
//! mapping-parse misses, chunk fallbacks, ref-match misses); only
//! structurally invalid input and a fully unreachable generative
//! collaborator surface as job failures.

use thiserror::Error;

use dm_agentic::AgenticError;
use dm_draft_types::DraftError;

pub type Result<T> = std::result::Result<T, StandardizerError>;

#[derive(Error, Debug)]
pub enum StandardizerError {
    /// The input draft is not a usable collection of structure items.
    #[error("invalid draft: {0}")]
    InvalidDraft(#[from] DraftError),

    /// Every chunk of a mandatory structure item failed at the transport
    /// level after the configured retries.
    #[error("generative collaborator unreachable for aggregate '{aggregate_alias}': {reason}")]
    LlmUnavailable {
        aggregate_alias: String,
        reason: String,
    },

    /// Client construction / configuration problems.
    #[error(transparent)]
    Agentic(#[from] AgenticError),
}
