// Error types for the ingestion and streaming pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur in the webhook/chat pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Webhook signature missing or invalid
    #[error("signature verification failed")]
    Signature,

    /// Downstream processing of a validated, non-duplicate event failed
    #[error("payload processing error: {0}")]
    PayloadProcessing(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Tool execution error
    #[error("tool execution error: {0}")]
    ToolExecution(String),

    /// Event or turn store error
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error (missing secret, malformed setting)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Stream terminated after the maximum number of model/tool round-trips
    #[error("max steps ({0}) reached")]
    MaxStepsReached(usize),

    /// Stream was cancelled by the caller
    #[error("stream cancelled")]
    Cancelled,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    /// Create a payload processing error
    pub fn processing(msg: impl Into<String>) -> Self {
        PipelineError::PayloadProcessing(msg.into())
    }

    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        PipelineError::Llm(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(msg: impl Into<String>) -> Self {
        PipelineError::ToolExecution(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        PipelineError::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Configuration(msg.into())
    }
}
