//! Hosted language model access
//!
//! - `client`: the [`LanguageModel`] seam and its Gemini implementation
//! - `retry`: transient-failure retry policy
//! - `prompts`: prompt templates shared by the tools

mod client;
mod error;
pub mod prompts;
mod retry;

pub use client::{classify_status, GeminiClient, LanguageModel};
pub use error::LlmError;
pub use prompts::ChatMessage;
pub use retry::{generate_with_retry, RetryPolicy};
