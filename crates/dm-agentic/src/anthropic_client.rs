//! Anthropic Client
//!
//! LLM client implementation for Anthropic Claude API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AgenticError;
use crate::llm_client::{LlmClient, ToolCallResult, ToolDefinition};

/// Default Anthropic model
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Anthropic Claude API client
#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl AnthropicClient {
    /// Create a new Anthropic client with the given API key
    pub fn new(api_key: String) -> Self {
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self {
            api_key,
            client: reqwest::Client::new(),
            model,
        }
    }

    /// Create with a specific model
    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self, AgenticError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            AgenticError::Configuration("ANTHROPIC_API_KEY environment variable not set".into())
        })?;
        Ok(Self::new(api_key))
    }

    async fn post_messages(&self, body: Value) -> Result<Value, AgenticError> {
        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgenticError::Transport(format!(
                "Anthropic API error {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Internal API call implementation
    async fn call_api(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AgenticError> {
        let raw = self
            .post_messages(serde_json::json!({
                "model": &self.model,
                "max_tokens": 4096,
                "system": system_prompt,
                "messages": [{"role": "user", "content": user_prompt}]
            }))
            .await?;

        #[derive(Deserialize)]
        struct ContentBlock {
            text: Option<String>,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            content: Vec<ContentBlock>,
        }

        let api_response: ApiResponse = serde_json::from_value(raw)
            .map_err(|e| AgenticError::Transport(format!("unexpected Anthropic response: {e}")))?;
        api_response
            .content
            .first()
            .and_then(|c| c.text.clone())
            .ok_or(AgenticError::EmptyResponse)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AgenticError> {
        self.call_api(system_prompt, user_prompt).await
    }

    async fn chat_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, AgenticError> {
        // Anthropic doesn't have json_object mode, rely on prompt engineering
        let json_system = format!(
            "{}\n\nIMPORTANT: Respond with valid JSON only. No markdown code blocks, no explanations.",
            system_prompt
        );
        self.call_api(&json_system, user_prompt).await
    }

    async fn chat_structured(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tool: &ToolDefinition,
    ) -> Result<ToolCallResult, AgenticError> {
        let raw = self
            .post_messages(serde_json::json!({
                "model": &self.model,
                "max_tokens": 4096,
                "system": system_prompt,
                "messages": [{"role": "user", "content": user_prompt}],
                "tools": [{
                    "name": &tool.name,
                    "description": &tool.description,
                    "input_schema": &tool.parameters
                }],
                "tool_choice": {"type": "tool", "name": &tool.name}
            }))
            .await?;

        // Response format: { "content": [{ "type": "tool_use", "name": "...", "input": {...} }] }
        let tool_use = raw
            .get("content")
            .and_then(Value::as_array)
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|b| b.get("type").and_then(Value::as_str) == Some("tool_use"))
            })
            .ok_or_else(|| {
                AgenticError::SchemaViolation("no tool_use block in Anthropic response".into())
            })?;

        let arguments = tool_use
            .get("input")
            .cloned()
            .ok_or_else(|| AgenticError::SchemaViolation("tool_use block has no input".into()))?;

        tracing::debug!(tool = %tool.name, "Anthropic tool_use arguments received");

        Ok(ToolCallResult {
            tool_name: tool.name.clone(),
            arguments,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_model() {
        let client = AnthropicClient::with_model("test-key".to_string(), "claude-test");
        assert_eq!(client.model_name(), "claude-test");
        assert_eq!(client.provider_name(), "Anthropic");
    }
}
