// OpenAI-compatible LLM provider
//
// Implements chathook_core::LlmProvider over the streaming chat
// completions protocol.

pub mod driver;

pub use driver::OpenAiDriver;
