//! Agentic error taxonomy.
//!
//! The pipeline needs to tell transport-level failures (retryable, fatal if
//! every chunk of an item hits them) apart from schema violations (chunk
//! retry, then fallback to the original items).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgenticError {
    /// HTTP/network-level failure talking to the provider.
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// The provider answered, but the payload does not fit the tool schema.
    #[error("structured output violated the response schema: {0}")]
    SchemaViolation(String),

    /// The provider returned no usable content at all.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// Missing API key or unknown backend selection.
    #[error("agent configuration error: {0}")]
    Configuration(String),
}

impl AgenticError {
    /// Transport-level failures may succeed on retry and count towards the
    /// collaborator-unreachable fatal rule; everything else is a payload
    /// problem.
    pub fn is_transport(&self) -> bool {
        matches!(self, AgenticError::Transport(_))
    }
}

impl From<reqwest::Error> for AgenticError {
    fn from(e: reqwest::Error) -> Self {
        AgenticError::Transport(e.to_string())
    }
}
