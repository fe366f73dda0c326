//! Pipeline configuration.

use serde::{Deserialize, Serialize};

pub use dm_standard_rag::RetrieverConfig;

/// Chunked-transformation tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Items per generative sub-request before any shrinking.
    pub base_chunk_size: usize,
    /// Approximate token ceiling for one generative request.
    pub token_budget: usize,
    /// How many times the chunk size may be halved before giving up on
    /// shrinking (floor of 1 item per chunk).
    pub max_shrink_count: usize,
    /// Retries per chunk before falling back to the original items.
    pub max_chunk_retries: usize,
    /// Base backoff between chunk retries; grows linearly per attempt.
    pub retry_backoff_ms: u64,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            base_chunk_size: 10,
            token_budget: 8000,
            max_shrink_count: 4,
            max_chunk_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

/// Top-level configuration for one standardizer instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardizerConfig {
    pub retriever: RetrieverConfig,
    pub transformer: TransformerConfig,
}
