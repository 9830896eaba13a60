use thiserror::Error;

use crate::agent::{AgentType, PipelineStep};
use crate::llm::LlmError;

/// Errors surfaced by a single agent invocation.
///
/// Transient variants are absorbed by the retry controller; contract
/// violations (`MissingDependency`) are never retried.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("malformed agent output: {0}")]
    MalformedOutput(String),

    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("{agent} invoked without required payload from {missing}")]
    MissingDependency {
        agent: AgentType,
        missing: PipelineStep,
    },

    #[error("validation unresolved after {attempts} fix attempts ({open_issues} issues open)")]
    ValidationExhausted { attempts: u32, open_issues: usize },
}

impl AgentError {
    /// Contract violations are programmer errors: retrying cannot fix them.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, AgentError::MissingDependency { .. })
    }
}

/// Errors from job store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("job not found")]
    NotFound,
}
