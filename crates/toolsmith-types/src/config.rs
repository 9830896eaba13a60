//! Global configuration types.
//!
//! Deserialized from `{data_dir}/config.toml` by the infra loader; every
//! field has a default so a missing or partial file still yields a usable
//! configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Toolsmith service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Job-wide default model, used when no per-agent override applies.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Whole-job timeout budget in seconds.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Hard cap on design-refinement passes.
    #[serde(default = "default_refinement_max_passes")]
    pub refinement_max_passes: u32,

    /// Hard cap on validate-then-fix cycles.
    #[serde(default = "default_validation_max_attempts")]
    pub validation_max_attempts: u32,

    /// LLM provider endpoint configuration.
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// OpenAI-compatible provider endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the chat-completions endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. When absent, the `TOOLSMITH_API_KEY` environment variable is
    /// consulted; when that is also absent, the service falls back to
    /// deterministic scripted agents (dry-run mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_job_timeout_secs() -> u64 {
    900
}

fn default_refinement_max_passes() -> u32 {
    3
}

fn default_validation_max_attempts() -> u32 {
    3
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            job_timeout_secs: default_job_timeout_secs(),
            refinement_max_passes: default_refinement_max_passes(),
            validation_max_attempts: default_validation_max_attempts(),
            provider: ProviderConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
        }
    }
}
