//! LLM Client Trait
//!
//! Unified interface for LLM providers (Anthropic, OpenAI).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgenticError;

/// Tool/function definition for structured output
///
/// Used with `chat_structured()` to force the LLM to return schema-shaped
/// JSON.
/// - Anthropic: maps to `tools` array with `tool_choice`
/// - OpenAI: maps to `functions` array with `function_call`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool/function name (e.g., "apply_naming_standards")
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the tool's parameters
    pub parameters: serde_json::Value,
}

/// Result from a tool/function call
///
/// Contains the structured JSON arguments returned by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Name of the tool that was called
    pub tool_name: String,
    /// Structured arguments as JSON
    pub arguments: serde_json::Value,
}

/// Unified LLM client interface for both Anthropic and OpenAI.
///
/// The chunk pipeline only uses `chat_structured`; the plain variants exist
/// for diagnostics and ad-hoc callers.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Call the LLM with system + user prompts, return raw text response
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AgenticError>;

    /// Call the LLM expecting JSON response
    /// - For OpenAI: uses response_format json_object mode
    /// - For Anthropic: adds JSON instruction to system prompt
    async fn chat_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, AgenticError>;

    /// Call LLM with a tool/function, forcing structured output.
    ///
    /// A payload that cannot be parsed as the tool arguments surfaces as
    /// [`AgenticError::SchemaViolation`]; the pipeline treats that as a
    /// chunk failure, never a job failure.
    async fn chat_structured(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tool: &ToolDefinition,
    ) -> Result<ToolCallResult, AgenticError>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;
}
