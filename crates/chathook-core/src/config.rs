// Agent configuration for the response streamer

use crate::tools::ToolDefinition;
use serde::{Deserialize, Serialize};

/// Configuration for streamed agent responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Static system prompt block. Scheduled-task descriptions are
    /// appended at call time by the streamer.
    pub system_prompt: String,

    /// Model identifier (e.g., "gpt-4o")
    pub model: String,

    /// Available tools for the agent
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,

    /// Maximum number of model/tool round-trips per stream
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Temperature for LLM sampling (0.0 - 2.0)
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate per response
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_max_steps() -> usize {
    10
}

impl AgentConfig {
    /// Create a new agent configuration
    pub fn new(system_prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            model: model.into(),
            tools: Vec::new(),
            max_steps: default_max_steps(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Add tools to the configuration
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set maximum model/tool round-trips
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_string(),
            model: "gpt-4o".to_string(),
            tools: Vec::new(),
            max_steps: default_max_steps(),
            temperature: None,
            max_tokens: None,
        }
    }
}
