//! LlmProvider trait definition.
//!
//! The abstraction every model backend implements. Agents consume whole
//! completions; this system has no streaming surface, so the trait is a
//! single RPITIT method plus a name.
//!
//! Implementations live in toolsmith-infra (e.g. the OpenAI-compatible
//! HTTP provider).

use toolsmith_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM provider backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai-compat", "scripted").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
