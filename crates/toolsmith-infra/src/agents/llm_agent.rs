//! Provider-backed implementation of the construction-agent contract.

use std::sync::Arc;

use toolsmith_core::agent::{AgentOutcome, ConstructionAgent};
use toolsmith_core::llm::LlmProvider;
use toolsmith_core::pipeline::ExecutionContext;
use toolsmith_types::agent::AgentType;
use toolsmith_types::error::AgentError;
use toolsmith_types::job::ConstructionJob;
use toolsmith_types::llm::{CompletionRequest, Message};

use super::{parse_outcome, prompts};

/// Sampling temperature for construction prompts; low, the outputs are
/// structural.
const TEMPERATURE: f64 = 0.2;

/// One construction agent backed by an LLM provider.
pub struct LlmConstructionAgent<P: LlmProvider> {
    agent: AgentType,
    provider: Arc<P>,
}

impl<P: LlmProvider> LlmConstructionAgent<P> {
    pub fn new(agent: AgentType, provider: Arc<P>) -> Self {
        Self { agent, provider }
    }
}

/// Output budget per agent; assembly and repair produce whole components.
fn max_tokens(agent: AgentType) -> u32 {
    match agent {
        AgentType::ComponentAssembler | AgentType::ToolFinalizer => 8192,
        AgentType::CodeValidator => 2048,
        _ => 4096,
    }
}

impl<P: LlmProvider> ConstructionAgent for LlmConstructionAgent<P> {
    fn agent_type(&self) -> AgentType {
        self.agent
    }

    async fn execute(
        &self,
        job: &ConstructionJob,
        ctx: &ExecutionContext,
    ) -> Result<AgentOutcome, AgentError> {
        let request = CompletionRequest {
            model: ctx.model.clone(),
            messages: vec![Message::user(prompts::user_prompt(self.agent, job, ctx))],
            system: Some(prompts::system_prompt(self.agent)),
            max_tokens: max_tokens(self.agent),
            temperature: Some(TEMPERATURE),
        };

        let response = self.provider.complete(&request).await?;

        tracing::debug!(
            job_id = %job.id,
            agent = %self.agent,
            model = response.model.as_str(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "agent completion received"
        );

        parse_outcome(self.agent, &response.content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
