//! LLM client construction from environment configuration.

use std::sync::Arc;

use crate::anthropic_client::AnthropicClient;
use crate::backend::AgentBackend;
use crate::error::AgenticError;
use crate::llm_client::LlmClient;
use crate::openai_client::OpenAiClient;

/// Create the client selected by `AGENT_BACKEND`, keyed from the matching
/// environment variable.
pub fn create_llm_client() -> Result<Arc<dyn LlmClient>, AgenticError> {
    create_llm_client_for(AgentBackend::from_env()?)
}

/// Create a client for an explicit backend, keyed from the environment.
pub fn create_llm_client_for(backend: AgentBackend) -> Result<Arc<dyn LlmClient>, AgenticError> {
    match backend {
        AgentBackend::Anthropic => Ok(Arc::new(AnthropicClient::from_env()?)),
        AgentBackend::OpenAi => Ok(Arc::new(OpenAiClient::from_env()?)),
    }
}
