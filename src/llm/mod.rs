//! Remote chat-completion clients and prompt templates.
//!
//! Both remote services speak the OpenAI-compatible chat-completions
//! protocol; the [`ChatCompletion`] trait lets the pipeline run against
//! any implementation, including in-process fakes in tests.

pub mod client;
pub mod prompts;

pub use client::{
    ChatCompletion, ChatMessage, ChatRequest, EndpointConfig, LlmError, OpenAiCompatibleClient,
};
