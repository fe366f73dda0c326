//! Chunk transformation against the generative collaborator.
//!
//! One chunk = a bounded slice of one collection (fields, enumerations or
//! value objects) plus minimal parent context. Refs never appear here; the
//! pipeline strips them before building requests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::client_factory::create_llm_client;
use crate::error::AgenticError;
use crate::llm_client::LlmClient;
use crate::schema::chunk_response_tool;

/// Rough serialized-size-to-token ratio used for budget estimation.
pub const APPROX_CHARS_PER_TOKEN: usize = 4;

/// One draft item as sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkItem {
    pub name: String,
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    /// Already substituted deterministically; the model must pass it
    /// through unchanged.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub resolved: bool,
}

/// One generative sub-request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRequest {
    pub bounded_context: String,
    pub aggregate_name: String,
    pub aggregate_alias: String,
    /// "fields" | "enumerations" | "valueObjects"
    pub property_type: String,
    pub items: Vec<ChunkItem>,
    /// Resolved deterministic mappings, sorted for prompt stability.
    pub entity_mappings: Vec<(String, String)>,
    pub name_mappings: Vec<(String, String)>,
    /// Retrieved standard excerpts relevant to this scope.
    pub standards: Vec<String>,
    /// No deterministic standard was found for this job; the model is told
    /// so explicitly instead of being left to guess.
    pub no_standard_found: bool,
}

/// One standardized entry in the tool response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedItem {
    pub alias: String,
    pub name: String,
    #[serde(default)]
    pub unmatched: bool,
}

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    items: Vec<TransformedItem>,
}

/// Serialized size of the request, in approximate tokens. Used by the
/// chunk-size shrink loop before any call is made.
pub fn estimate_request_tokens(request: &ChunkRequest) -> usize {
    let serialized = serde_json::to_string(request).unwrap_or_default();
    serialized.len().div_ceil(APPROX_CHARS_PER_TOKEN)
}

/// Applies naming standards to one chunk via a forced tool call.
pub struct ChunkGenerator {
    client: Arc<dyn LlmClient>,
}

impl ChunkGenerator {
    /// Create from environment variables (`AGENT_BACKEND` + API keys).
    pub fn from_env() -> Result<Self, AgenticError> {
        Ok(Self {
            client: create_llm_client()?,
        })
    }

    /// Create with a specific LLM client
    pub fn with_client(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Transform one chunk. Schema-shaped failures surface as
    /// [`AgenticError::SchemaViolation`] so the caller can retry or fall
    /// back without aborting sibling chunks.
    #[instrument(skip(self, request),
                 fields(aggregate = %request.aggregate_alias,
                        property_type = %request.property_type,
                        items = request.items.len(),
                        model = %self.client.model_name()))]
    pub async fn transform_chunk(
        &self,
        request: &ChunkRequest,
    ) -> Result<Vec<TransformedItem>, AgenticError> {
        let tool = chunk_response_tool();
        let system_prompt = self.build_system_prompt(request);
        let user_prompt = self.build_user_prompt(request)?;

        let result = self
            .client
            .chat_structured(&system_prompt, &user_prompt, &tool)
            .await?;

        let response: ChunkResponse = serde_json::from_value(result.arguments)
            .map_err(|e| AgenticError::SchemaViolation(e.to_string()))?;
        if response.items.is_empty() {
            return Err(AgenticError::SchemaViolation(
                "tool response contained no items".into(),
            ));
        }
        Ok(response.items)
    }

    fn build_system_prompt(&self, request: &ChunkRequest) -> String {
        let standards_section = if request.standards.is_empty() {
            "(no standard excerpts retrieved for this scope)".to_string()
        } else {
            request.standards.join("\n")
        };

        let mappings_section = if request.no_standard_found {
            "No deterministic standard was found for this draft. Derive names from the \
             excerpts above where possible; set unmatched=true where they do not apply."
                .to_string()
        } else {
            let mut lines = Vec::new();
            for (from, to) in &request.entity_mappings {
                lines.push(format!("- entity {from} → table {to}"));
            }
            for (from, to) in &request.name_mappings {
                lines.push(format!("- name {from} → {to}"));
            }
            if lines.is_empty() {
                "(no mappings resolved for this scope)".to_string()
            } else {
                lines.join("\n")
            }
        };

        format!(
            r#"# Naming Standard Application

You rename domain-model draft elements to conform to the company naming standard.

## Retrieved Standard Excerpts

{standards_section}

## Already-Resolved Mappings

{mappings_section}

## Rules

1. Return EXACTLY one entry per input item, in input order.
2. Never change an alias - it is the item's identity.
3. Items marked resolved are already standardized: return their name unchanged.
4. If no standard applies to an item, return its original name with unmatched=true.
5. Do not invent items that were not in the input.
"#
        )
    }

    fn build_user_prompt(&self, request: &ChunkRequest) -> Result<String, AgenticError> {
        let items = serde_json::to_string_pretty(&request.items)
            .map_err(|e| AgenticError::SchemaViolation(e.to_string()))?;
        Ok(format!(
            r#"Apply the naming standard to this chunk.

## Scope
- Bounded context: {bc}
- Aggregate: {agg_name} (alias: {agg_alias})
- Collection: {property_type}

## Items
{items}
"#,
            bc = request.bounded_context,
            agg_name = request.aggregate_name,
            agg_alias = request.aggregate_alias,
            property_type = request.property_type,
        ))
    }
}
