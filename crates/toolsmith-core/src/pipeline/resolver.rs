//! Model resolution and execution budgets.
//!
//! `ModelResolver::resolve` is a pure function of (agent type, job record,
//! static policy table) producing the [`ExecutionContext`] consumed by the
//! invoker, the retry controller, and the sub-loops. No side effects.

use std::collections::HashMap;
use std::time::Duration;

use toolsmith_types::agent::AgentType;
use toolsmith_types::job::ConstructionJob;
use toolsmith_types::retry::{AdaptationStrategy, BackoffStrategy, RetryPolicy};

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// The resolved budget for one agent invocation: model, timeout, and retry
/// policy, plus the attempt-specific fields the retry controller fills in.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub agent: AgentType,
    /// Concrete model identifier for this invocation.
    pub model: String,
    /// Step-level timeout enforced by the invoker.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// 1-based attempt number; 1 outside a retry loop.
    pub attempt: u32,
    /// Prompt adaptation for this attempt.
    pub adaptation: AdaptationStrategy,
}

// ---------------------------------------------------------------------------
// PolicyTable
// ---------------------------------------------------------------------------

/// Static per-agent execution policy.
#[derive(Debug, Clone)]
pub struct StepPolicy {
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

/// Per-agent policies with defaults tuned to each step's cost profile.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<AgentType, StepPolicy>,
}

impl PolicyTable {
    /// The policy for an agent.
    pub fn policy(&self, agent: AgentType) -> &StepPolicy {
        // The constructor covers every AgentType variant.
        self.policies
            .get(&agent)
            .expect("policy table covers every AgentType")
    }

    /// Replace the policy for one agent (tests, tuning).
    pub fn set(&mut self, agent: AgentType, policy: StepPolicy) {
        self.policies.insert(agent, policy);
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        let policies = AgentType::ALL
            .into_iter()
            .map(|agent| (agent, default_policy(agent)))
            .collect();
        Self { policies }
    }
}

fn default_policy(agent: AgentType) -> StepPolicy {
    match agent {
        AgentType::FunctionPlanner => StepPolicy {
            timeout_secs: 120,
            retry: RetryPolicy {
                max_attempts: 3,
                backoff: BackoffStrategy::Exponential,
                base_delay_ms: 500,
                fallback_models: Vec::new(),
            },
        },
        AgentType::StateDesign | AgentType::JsxLayout | AgentType::TailwindStyling => StepPolicy {
            timeout_secs: 180,
            retry: RetryPolicy {
                max_attempts: 3,
                backoff: BackoffStrategy::Exponential,
                base_delay_ms: 500,
                fallback_models: Vec::new(),
            },
        },
        // Assembly and validation produce the largest outputs; they get a
        // longer budget and a cheaper fallback model for the last attempt.
        AgentType::ComponentAssembler | AgentType::CodeValidator => StepPolicy {
            timeout_secs: 240,
            retry: RetryPolicy {
                max_attempts: 4,
                backoff: BackoffStrategy::Exponential,
                base_delay_ms: 1000,
                fallback_models: vec!["gpt-4o-mini".to_string()],
            },
        },
        AgentType::ToolFinalizer => StepPolicy {
            timeout_secs: 120,
            retry: RetryPolicy {
                max_attempts: 2,
                backoff: BackoffStrategy::Fixed,
                base_delay_ms: 500,
                fallback_models: Vec::new(),
            },
        },
    }
}

// ---------------------------------------------------------------------------
// ModelResolver
// ---------------------------------------------------------------------------

/// Resolves the execution context for one agent invocation.
pub struct ModelResolver;

impl ModelResolver {
    /// Model precedence: per-job override for the agent, then the job-wide
    /// default model.
    pub fn resolve(
        agent: AgentType,
        job: &ConstructionJob,
        table: &PolicyTable,
    ) -> ExecutionContext {
        let policy = table.policy(agent);
        let model = job
            .model_overrides
            .get(&agent)
            .cloned()
            .unwrap_or_else(|| job.default_model.clone());

        ExecutionContext {
            agent,
            model,
            timeout: Duration::from_secs(policy.timeout_secs),
            retry: policy.retry.clone(),
            attempt: 1,
            adaptation: AdaptationStrategy::Standard,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
