//! Agent backend selection.

use std::fmt;
use std::str::FromStr;

use crate::error::AgenticError;

/// Which LLM provider serves the generative calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentBackend {
    Anthropic,
    OpenAi,
}

impl AgentBackend {
    /// Read `AGENT_BACKEND`; Anthropic is the default.
    pub fn from_env() -> Result<Self, AgenticError> {
        match std::env::var("AGENT_BACKEND") {
            Ok(value) => value.parse(),
            Err(_) => Ok(AgentBackend::Anthropic),
        }
    }
}

impl FromStr for AgentBackend {
    type Err = AgenticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(AgentBackend::Anthropic),
            "openai" => Ok(AgentBackend::OpenAi),
            other => Err(AgenticError::Configuration(format!(
                "unknown AGENT_BACKEND '{other}' (expected 'anthropic' or 'openai')"
            ))),
        }
    }
}

impl fmt::Display for AgentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentBackend::Anthropic => write!(f, "anthropic"),
            AgentBackend::OpenAi => write!(f, "openai"),
        }
    }
}
