//! LLM-backed naming transformation
//!
//! This crate owns the generative-completion seam of the standardization
//! pipeline: the provider-agnostic [`LlmClient`] trait, the Anthropic and
//! OpenAI implementations, and the [`ChunkGenerator`] that turns one chunk
//! of draft items plus retrieved standard evidence into standardized names
//! via a forced tool call.
//!
//! It has no database dependencies; orchestration stays in the pipeline
//! crate.
//!
//! ## Backend Selection
//!
//! Set the `AGENT_BACKEND` environment variable:
//! - `anthropic` (default): Anthropic Claude API
//! - `openai`: OpenAI API

pub mod anthropic_client;
pub mod backend;
pub mod chunk;
pub mod client_factory;
pub mod error;
pub mod llm_client;
pub mod openai_client;
pub mod schema;

pub use backend::AgentBackend;
pub use chunk::{ChunkGenerator, ChunkItem, ChunkRequest, TransformedItem};
pub use client_factory::{create_llm_client, create_llm_client_for};
pub use error::AgenticError;
pub use llm_client::{LlmClient, ToolCallResult, ToolDefinition};
