//! Agent invoker: execute exactly one agent step.
//!
//! Checks declared dependencies, dispatches through the closed registry,
//! enforces the step-level timeout, and attaches the resulting payload to a
//! copy of the job record. Performs no retry; that is the retry
//! controller's responsibility.

use std::sync::Arc;

use toolsmith_types::agent::AgentType;
use toolsmith_types::error::AgentError;
use toolsmith_types::job::ConstructionJob;

use crate::agent::{AgentOutcome, AgentRegistry};

use super::resolver::ExecutionContext;

/// Executes one named agent against a job record.
pub struct AgentInvoker {
    registry: Arc<AgentRegistry>,
}

impl AgentInvoker {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    /// Run `agent` once.
    ///
    /// Returns the typed outcome plus an updated copy of the job record with
    /// the step's payload attached. The input record is untouched, so a
    /// failed attempt can be retried from the same state.
    ///
    /// # Errors
    ///
    /// - [`AgentError::MissingDependency`] when a declared payload
    ///   dependency is absent (contract violation, never retried).
    /// - [`AgentError::Timeout`] when the step exceeds its budget.
    /// - [`AgentError::MalformedOutput`] when the agent returns an outcome
    ///   for a different step.
    /// - Any error the agent itself surfaces.
    pub async fn execute(
        &self,
        agent: AgentType,
        ctx: &ExecutionContext,
        job: &ConstructionJob,
    ) -> Result<(AgentOutcome, ConstructionJob), AgentError> {
        for dep in agent.required_payloads() {
            if !job.payload_present(*dep) {
                return Err(AgentError::MissingDependency {
                    agent,
                    missing: *dep,
                });
            }
        }

        let worker = self.registry.get(agent);

        tracing::debug!(
            job_id = %job.id,
            agent = %agent,
            model = ctx.model.as_str(),
            attempt = ctx.attempt,
            "invoking agent"
        );

        let outcome = tokio::time::timeout(ctx.timeout, worker.execute(job, ctx))
            .await
            .map_err(|_| AgentError::Timeout {
                timeout_secs: ctx.timeout.as_secs(),
            })??;

        if outcome.agent() != agent {
            return Err(AgentError::MalformedOutput(format!(
                "agent {agent} returned a payload for {}",
                outcome.agent()
            )));
        }

        let mut updated = job.clone();
        outcome.clone().apply_to(&mut updated);
        Ok((outcome, updated))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::scripted::scripted_registry;
    use crate::agent::{BoxConstructionAgent, ConstructionAgent};
    use crate::pipeline::record::new_job;
    use crate::pipeline::resolver::{ModelResolver, PolicyTable};
    use std::time::Duration;
    use toolsmith_types::job::{FunctionSignaturePlan, ToolRequest};

    fn sample_job() -> ConstructionJob {
        new_job(
            "tester",
            ToolRequest {
                description: "a unit converter".to_string(),
                target_audience: None,
                industry: None,
                features: vec!["metric to imperial".to_string()],
                brainstorm: None,
            },
            "gpt-4o",
            Default::default(),
            None,
        )
    }

    #[tokio::test]
    async fn execute_attaches_payload_to_copy() {
        let invoker = AgentInvoker::new(Arc::new(scripted_registry()));
        let job = sample_job();
        let ctx = ModelResolver::resolve(AgentType::FunctionPlanner, &job, &PolicyTable::default());

        let (outcome, updated) = invoker
            .execute(AgentType::FunctionPlanner, &ctx, &job)
            .await
            .unwrap();

        assert_eq!(outcome.agent(), AgentType::FunctionPlanner);
        assert!(updated.function_plan.is_some());
        // Input record untouched
        assert!(job.function_plan.is_none());
    }

    #[tokio::test]
    async fn execute_rejects_missing_dependency() {
        let invoker = AgentInvoker::new(Arc::new(scripted_registry()));
        let job = sample_job();
        let ctx = ModelResolver::resolve(AgentType::JsxLayout, &job, &PolicyTable::default());

        let err = invoker
            .execute(AgentType::JsxLayout, &ctx, &job)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::MissingDependency { .. }));
        assert!(err.is_contract_violation());
    }

    /// An agent that never finishes, to exercise the timeout path.
    struct StallingAgent;

    impl ConstructionAgent for StallingAgent {
        fn agent_type(&self) -> AgentType {
            AgentType::FunctionPlanner
        }

        async fn execute(
            &self,
            _job: &ConstructionJob,
            _ctx: &ExecutionContext,
        ) -> Result<AgentOutcome, AgentError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn execute_enforces_timeout() {
        let registry = AgentRegistry::build(|agent| {
            if agent == AgentType::FunctionPlanner {
                BoxConstructionAgent::new(StallingAgent)
            } else {
                BoxConstructionAgent::new(crate::agent::scripted::ScriptedAgent::new(agent))
            }
        });
        let invoker = AgentInvoker::new(Arc::new(registry));
        let job = sample_job();
        let mut ctx =
            ModelResolver::resolve(AgentType::FunctionPlanner, &job, &PolicyTable::default());
        ctx.timeout = Duration::from_millis(20);

        let err = invoker
            .execute(AgentType::FunctionPlanner, &ctx, &job)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout { .. }));
    }

    /// An agent that answers for the wrong step.
    struct ConfusedAgent;

    impl ConstructionAgent for ConfusedAgent {
        fn agent_type(&self) -> AgentType {
            AgentType::FunctionPlanner
        }

        async fn execute(
            &self,
            _job: &ConstructionJob,
            _ctx: &ExecutionContext,
        ) -> Result<AgentOutcome, AgentError> {
            Ok(AgentOutcome::FunctionPlan(FunctionSignaturePlan {
                signatures: Vec::new(),
            }))
        }
    }

    #[tokio::test]
    async fn execute_rejects_mismatched_outcome() {
        // Register the planner's outcome under the state-design slot.
        let registry = AgentRegistry::build(|agent| {
            if agent == AgentType::StateDesign {
                BoxConstructionAgent::new(ConfusedAgent)
            } else {
                BoxConstructionAgent::new(crate::agent::scripted::ScriptedAgent::new(agent))
            }
        });
        let invoker = AgentInvoker::new(Arc::new(registry));

        let mut job = sample_job();
        job.function_plan = Some(FunctionSignaturePlan {
            signatures: Vec::new(),
        });
        let ctx = ModelResolver::resolve(AgentType::StateDesign, &job, &PolicyTable::default());

        let err = invoker
            .execute(AgentType::StateDesign, &ctx, &job)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MalformedOutput(_)));
    }
}
