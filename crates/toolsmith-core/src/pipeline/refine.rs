//! Iterative design-refinement sub-loop.
//!
//! State-logic design benefits from re-inspection before downstream steps
//! depend on it, so the state-design agent runs for up to `max_passes`
//! self-consistent passes: each pass sees the previous pass's output on the
//! job record. The loop stops as soon as the stability predicate accepts
//! the design; the pass cap is a hard bound independent of agent behavior.

use std::sync::Arc;

use toolsmith_types::agent::AgentType;
use toolsmith_types::error::AgentError;
use toolsmith_types::job::{ConstructionJob, StateLogicDesign};

use super::invoker::AgentInvoker;
use super::resolver::ExecutionContext;
use super::retry::RetryController;

/// Predicate deciding whether a state design needs another pass.
///
/// The stability condition is deliberately parameterizable; the default
/// reads the agent-reported `design_complete` flag.
pub type StabilityCheck = Arc<dyn Fn(&StateLogicDesign) -> bool + Send + Sync>;

/// Bounded refinement loop for the state-design step.
#[derive(Clone)]
pub struct RefinementLoop {
    max_passes: u32,
    stability: StabilityCheck,
}

impl RefinementLoop {
    /// Loop with the default stability condition (`design_complete`).
    pub fn new(max_passes: u32) -> Self {
        Self::with_stability(max_passes, Arc::new(|design| design.design_complete))
    }

    /// Loop with a custom stability predicate.
    pub fn with_stability(max_passes: u32, stability: StabilityCheck) -> Self {
        Self {
            // A cap of zero would mean the step never runs; clamp to one.
            max_passes: max_passes.max(1),
            stability,
        }
    }

    pub fn max_passes(&self) -> u32 {
        self.max_passes
    }

    /// Run the state-design agent until stable or the cap is reached.
    ///
    /// On success the returned pass count is in `1..=max_passes` and is also
    /// recorded on the job record for observability.
    pub async fn run(
        &self,
        retry: &RetryController,
        invoker: &AgentInvoker,
        ctx: &ExecutionContext,
        mut job: ConstructionJob,
    ) -> (ConstructionJob, Result<u32, AgentError>) {
        let mut passes = 0;

        loop {
            passes += 1;

            let (next, result) = retry
                .execute(invoker, AgentType::StateDesign, ctx, job)
                .await;
            job = next;

            if let Err(err) = result {
                job.refinement_passes = passes;
                return (job, Err(err));
            }

            let stable = job
                .state_design
                .as_ref()
                .is_some_and(|design| (self.stability)(design));

            if stable || passes >= self.max_passes {
                if !stable {
                    tracing::info!(
                        job_id = %job.id,
                        passes,
                        "design refinement hit the pass cap before stabilizing"
                    );
                }
                job.refinement_passes = passes;
                return (job, Ok(passes));
            }

            tracing::debug!(job_id = %job.id, passes, "design not yet stable, refining");
        }
    }
}

impl std::fmt::Debug for RefinementLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefinementLoop")
            .field("max_passes", &self.max_passes)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::scripted::ScriptedAgent;
    use crate::agent::{AgentOutcome, AgentRegistry, BoxConstructionAgent, ConstructionAgent};
    use crate::pipeline::record::new_job;
    use crate::pipeline::resolver::{ModelResolver, PolicyTable};
    use std::sync::atomic::{AtomicU32, Ordering};
    use toolsmith_types::job::{FunctionSignaturePlan, ToolRequest};
    use toolsmith_types::retry::{BackoffStrategy, RetryPolicy};

    fn job_with_plan() -> ConstructionJob {
        let mut job = new_job(
            "tester",
            ToolRequest {
                description: "a mortgage calculator".to_string(),
                target_audience: None,
                industry: None,
                features: Vec::new(),
                brainstorm: None,
            },
            "gpt-4o",
            Default::default(),
            None,
        );
        job.function_plan = Some(FunctionSignaturePlan {
            signatures: Vec::new(),
        });
        job
    }

    fn fast_ctx(job: &ConstructionJob) -> ExecutionContext {
        let mut ctx = ModelResolver::resolve(AgentType::StateDesign, job, &PolicyTable::default());
        ctx.retry = RetryPolicy {
            max_attempts: 2,
            backoff: BackoffStrategy::Fixed,
            base_delay_ms: 1,
            fallback_models: Vec::new(),
        };
        ctx
    }

    /// Reports the design stable only from the nth pass onward.
    struct SlowToSettleAgent {
        calls: AtomicU32,
        stable_from: u32,
    }

    impl SlowToSettleAgent {
        fn stable_from(pass: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                stable_from: pass,
            }
        }
    }

    impl ConstructionAgent for SlowToSettleAgent {
        fn agent_type(&self) -> AgentType {
            AgentType::StateDesign
        }

        async fn execute(
            &self,
            _job: &ConstructionJob,
            _ctx: &ExecutionContext,
        ) -> Result<AgentOutcome, AgentError> {
            let pass = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AgentOutcome::StateDesign(StateLogicDesign {
                state_variables: Vec::new(),
                logic_description: format!("pass {pass}"),
                design_complete: pass >= self.stable_from,
            }))
        }
    }

    fn registry_with_designer(agent: impl ConstructionAgent + 'static) -> AgentInvoker {
        let slot = std::sync::Mutex::new(Some(agent));
        let registry = AgentRegistry::build(move |a| {
            if a == AgentType::StateDesign {
                if let Some(inner) = slot.lock().unwrap().take() {
                    return BoxConstructionAgent::new(inner);
                }
            }
            BoxConstructionAgent::new(ScriptedAgent::new(a))
        });
        AgentInvoker::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn stable_design_stops_after_one_pass() {
        let invoker = registry_with_designer(SlowToSettleAgent::stable_from(1));
        let job = job_with_plan();
        let ctx = fast_ctx(&job);

        let (job, result) = RefinementLoop::new(3)
            .run(&RetryController::new(), &invoker, &ctx, job)
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(job.refinement_passes, 1);
    }

    #[tokio::test]
    async fn unstable_design_refines_until_stable() {
        let invoker = registry_with_designer(SlowToSettleAgent::stable_from(3));
        let job = job_with_plan();
        let ctx = fast_ctx(&job);

        let (job, result) = RefinementLoop::new(5)
            .run(&RetryController::new(), &invoker, &ctx, job)
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(job.refinement_passes, 3);
        assert!(job.state_design.unwrap().design_complete);
    }

    #[tokio::test]
    async fn pass_cap_is_a_hard_bound() {
        // Never stabilizes; the cap must stop the loop.
        let invoker = registry_with_designer(SlowToSettleAgent::stable_from(u32::MAX));
        let job = job_with_plan();
        let ctx = fast_ctx(&job);

        let (job, result) = RefinementLoop::new(3)
            .run(&RetryController::new(), &invoker, &ctx, job)
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(job.refinement_passes, 3);
        // The design from the last pass is kept even though it never settled.
        assert!(!job.state_design.unwrap().design_complete);
    }

    #[tokio::test]
    async fn custom_stability_predicate_is_honored() {
        let invoker = registry_with_designer(SlowToSettleAgent::stable_from(1));
        let job = job_with_plan();
        let ctx = fast_ctx(&job);

        // Require at least two state variables; the test agent provides none,
        // so the loop must run to the cap.
        let refinement = RefinementLoop::with_stability(
            4,
            Arc::new(|design: &StateLogicDesign| design.state_variables.len() >= 2),
        );
        let (job, result) = refinement
            .run(&RetryController::new(), &invoker, &ctx, job)
            .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(job.refinement_passes, 4);
    }

    #[tokio::test]
    async fn zero_cap_still_runs_one_pass() {
        let invoker = registry_with_designer(SlowToSettleAgent::stable_from(1));
        let job = job_with_plan();
        let ctx = fast_ctx(&job);

        let (job, result) = RefinementLoop::new(0)
            .run(&RetryController::new(), &invoker, &ctx, job)
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(job.refinement_passes, 1);
    }
}
