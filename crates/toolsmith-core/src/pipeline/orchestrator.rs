//! Orchestrator: drive one job through the fixed agent sequence.
//!
//! For each step the driver marks the record, persists, and broadcasts
//! before and after invoking the agent (or sub-loop). A fatal step failure
//! stops the pipeline immediately: the record is marked `Failed` with the
//! failing step and message, persisted, broadcast, and no later step runs.
//! Earlier completed steps stay recorded as completed; there is no rollback.

use std::sync::Arc;
use std::time::Instant;

use toolsmith_types::agent::{AgentType, PipelineStep};
use toolsmith_types::config::GlobalConfig;
use toolsmith_types::error::{AgentError, RepositoryError};
use toolsmith_types::event::{ProgressEvent, StepProgressStatus};
use toolsmith_types::job::ConstructionJob;

use crate::agent::AgentRegistry;
use crate::event::ProgressBus;
use crate::repository::JobRepository;

use super::invoker::AgentInvoker;
use super::record::JobRecordExt;
use super::refine::RefinementLoop;
use super::repair::RepairLoop;
use super::resolver::{ModelResolver, PolicyTable};
use super::retry::RetryController;

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that terminate a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A step exhausted its retries or fix attempts.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        step: PipelineStep,
        #[source]
        source: AgentError,
    },

    /// The job record could not be persisted.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The whole-job timeout budget was exceeded (raised by the manager).
    #[error("job timed out")]
    Timeout,

    /// The job was cancelled (raised by the manager).
    #[error("job cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives the fixed seven-step sequence for one job at a time.
///
/// Generic over `R: JobRepository` for storage flexibility; a single
/// orchestrator instance is shared across all background job tasks.
pub struct Orchestrator<R: JobRepository> {
    repo: Arc<R>,
    bus: ProgressBus,
    invoker: AgentInvoker,
    retry: RetryController,
    policies: PolicyTable,
    refinement: RefinementLoop,
    repair: RepairLoop,
}

impl<R: JobRepository> Orchestrator<R> {
    pub fn new(
        repo: Arc<R>,
        bus: ProgressBus,
        registry: Arc<AgentRegistry>,
        config: &GlobalConfig,
    ) -> Self {
        Self {
            repo,
            bus,
            invoker: AgentInvoker::new(registry),
            retry: RetryController::new(),
            policies: PolicyTable::default(),
            refinement: RefinementLoop::new(config.refinement_max_passes),
            repair: RepairLoop::new(config.validation_max_attempts),
        }
    }

    /// Replace the default policy table (tests, tuning).
    pub fn with_policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// Replace the refinement loop (custom stability predicate).
    pub fn with_refinement(mut self, refinement: RefinementLoop) -> Self {
        self.refinement = refinement;
        self
    }

    /// Run every step in order, persisting and broadcasting around each.
    ///
    /// Returns the terminal job record; the same record is always persisted
    /// before this returns, so the read path and the return value agree.
    pub async fn run(&self, mut job: ConstructionJob) -> Result<ConstructionJob, PipelineError> {
        let run_start = Instant::now();

        tracing::info!(
            job_id = %job.id,
            user_id = job.user_id.as_str(),
            description = job.request.description.as_str(),
            "starting tool construction"
        );

        for step in PipelineStep::SEQUENCE {
            let agent = step.agent();

            job.begin_step(step);
            self.persist(&mut job).await?;
            self.emit_step(&job, step, StepProgressStatus::Started, None);

            let ctx = ModelResolver::resolve(agent, &job, &self.policies);

            let (next, result) = match step {
                PipelineStep::DesigningStateLogic => {
                    let (next, result) = self
                        .refinement
                        .run(&self.retry, &self.invoker, &ctx, job)
                        .await;
                    let summary = result.as_ref().ok().map(|passes| {
                        serde_json::json!({ "passes": passes })
                    });
                    (next, result.map(|_| summary.unwrap_or_default()))
                }
                PipelineStep::ValidatingCode => {
                    let fix_ctx = ModelResolver::resolve(
                        AgentType::ComponentAssembler,
                        &job,
                        &self.policies,
                    );
                    let (next, result) = self
                        .repair
                        .run(&self.retry, &self.invoker, &ctx, &fix_ctx, job)
                        .await;
                    let summary = result.as_ref().ok().map(|report| {
                        serde_json::json!({
                            "valid": report.valid,
                            "issues": report.issues.len(),
                        })
                    });
                    (next, result.map(|_| summary.unwrap_or_default()))
                }
                _ => {
                    let (next, result) =
                        self.retry.execute(&self.invoker, agent, &ctx, job).await;
                    let summary = result.as_ref().ok().map(|outcome| outcome.summary());
                    (next, result.map(|_| summary.unwrap_or_default()))
                }
            };
            job = next;

            match result {
                Ok(summary) => {
                    job.complete_step(step);
                    self.persist(&mut job).await?;
                    self.emit_step(&job, step, StepProgressStatus::Completed, Some(summary));
                    self.bus.publish(ProgressEvent::JobSnapshot {
                        job_id: job.id,
                        job: Box::new(job.clone()),
                        source_agent: agent,
                    });
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::error!(
                        job_id = %job.id,
                        step = %step,
                        error = message.as_str(),
                        "step failed, halting pipeline"
                    );

                    job.fail_at(step, message.clone());
                    self.persist(&mut job).await?;
                    self.emit_step(&job, step, StepProgressStatus::Failed, None);
                    self.bus.publish(ProgressEvent::JobFailed {
                        job_id: job.id,
                        step,
                        error: message,
                    });

                    return Err(PipelineError::StepFailed { step, source: err });
                }
            }
        }

        job.complete_job();
        self.persist(&mut job).await?;

        let duration_ms = run_start.elapsed().as_millis() as u64;
        self.bus.publish(ProgressEvent::JobCompleted {
            job_id: job.id,
            duration_ms,
        });

        tracing::info!(
            job_id = %job.id,
            duration_ms,
            refinement_passes = job.refinement_passes,
            "tool construction completed"
        );

        Ok(job)
    }

    async fn persist(&self, job: &mut ConstructionJob) -> Result<(), RepositoryError> {
        job.touch();
        self.repo.put(job).await
    }

    fn emit_step(
        &self,
        job: &ConstructionJob,
        step: PipelineStep,
        status: StepProgressStatus,
        payload: Option<serde_json::Value>,
    ) {
        let message = match status {
            StepProgressStatus::Started => step.display_name().to_string(),
            StepProgressStatus::Completed => format!("{} completed", step.display_name()),
            StepProgressStatus::Failed => format!(
                "{} failed: {}",
                step.display_name(),
                job.error.as_deref().unwrap_or("unknown error")
            ),
        };
        self.bus.publish(ProgressEvent::StepProgress {
            job_id: job.id,
            step,
            status,
            message,
            payload,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::scripted::{ScriptedAgent, scripted_registry};
    use crate::agent::{AgentOutcome, BoxConstructionAgent, ConstructionAgent};
    use crate::pipeline::record::new_job;
    use crate::pipeline::resolver::ExecutionContext;
    use crate::repository::InMemoryJobRepository;
    use std::collections::HashMap;
    use toolsmith_types::job::{JobStatus, StepState, ToolRequest, ValidationReport};
    use toolsmith_types::llm::LlmError;
    use toolsmith_types::retry::{BackoffStrategy, RetryPolicy};

    fn fast_policies() -> PolicyTable {
        let mut table = PolicyTable::default();
        for agent in AgentType::ALL {
            let mut policy = table.policy(agent).clone();
            policy.retry = RetryPolicy {
                max_attempts: policy.retry.max_attempts,
                backoff: BackoffStrategy::Fixed,
                base_delay_ms: 1,
                fallback_models: policy.retry.fallback_models.clone(),
            };
            table.set(agent, policy);
        }
        table
    }

    fn roi_job() -> ConstructionJob {
        new_job(
            "alice",
            ToolRequest {
                description: "ROI calculator".to_string(),
                target_audience: Some("marketing managers".to_string()),
                industry: Some("saas".to_string()),
                features: vec!["monthly roi".to_string()],
                brainstorm: None,
            },
            "gpt-4o",
            HashMap::new(),
            None,
        )
    }

    fn orchestrator(
        repo: Arc<InMemoryJobRepository>,
        registry: AgentRegistry,
    ) -> Orchestrator<InMemoryJobRepository> {
        Orchestrator::new(
            repo,
            ProgressBus::new(64),
            Arc::new(registry),
            &GlobalConfig::default(),
        )
        .with_policies(fast_policies())
    }

    #[tokio::test]
    async fn happy_path_completes_every_step() {
        let repo = Arc::new(InMemoryJobRepository::new());
        let orch = orchestrator(Arc::clone(&repo), scripted_registry());

        let job = orch.run(roi_job()).await.unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        for step in PipelineStep::SEQUENCE {
            assert_eq!(job.step_state(step), StepState::Completed, "{step}");
        }
        let finalized = job.finalized.as_ref().unwrap();
        assert!(!finalized.component_code.is_empty());
        assert!(job.refinement_passes >= 1);

        // Persisted record agrees with the returned one.
        let stored = repo.get(job.id, "alice").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn steps_complete_in_sequence_order() {
        let repo = Arc::new(InMemoryJobRepository::new());
        let orch = orchestrator(Arc::clone(&repo), scripted_registry());
        let mut rx = orch.bus.subscribe();

        orch.run(roi_job()).await.unwrap();

        // Collect completion events in emission order.
        let mut completed = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ProgressEvent::StepProgress {
                step,
                status: StepProgressStatus::Completed,
                ..
            } = event
            {
                completed.push(step);
            }
        }
        assert_eq!(completed, PipelineStep::SEQUENCE.to_vec());
    }

    /// Planner that always fails with a transient provider error.
    struct BrokenPlanner;

    impl ConstructionAgent for BrokenPlanner {
        fn agent_type(&self) -> AgentType {
            AgentType::FunctionPlanner
        }

        async fn execute(
            &self,
            _job: &ConstructionJob,
            _ctx: &ExecutionContext,
        ) -> Result<AgentOutcome, AgentError> {
            Err(AgentError::Provider(LlmError::Overloaded(
                "provider down".to_string(),
            )))
        }
    }

    #[tokio::test]
    async fn first_step_failure_halts_with_no_later_payloads() {
        let registry = AgentRegistry::build(|agent| {
            if agent == AgentType::FunctionPlanner {
                BoxConstructionAgent::new(BrokenPlanner)
            } else {
                BoxConstructionAgent::new(ScriptedAgent::new(agent))
            }
        });
        let repo = Arc::new(InMemoryJobRepository::new());
        let orch = orchestrator(Arc::clone(&repo), registry);

        let input = roi_job();
        let job_id = input.id;
        let err = orch.run(input).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StepFailed {
                step: PipelineStep::PlanningFunctionSignatures,
                ..
            }
        ));

        let stored = repo.get(job_id, "alice").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(
            stored.current_step,
            PipelineStep::PlanningFunctionSignatures
        );
        assert!(stored.error.is_some());
        // No payload for any step.
        for step in PipelineStep::SEQUENCE {
            assert!(!stored.payload_present(step), "{step} payload should be absent");
        }
        // Later steps never started.
        assert_eq!(
            stored.step_state(PipelineStep::DesigningStateLogic),
            StepState::Pending
        );
    }

    /// Validator that never accepts the artifact.
    struct RejectingValidator;

    impl ConstructionAgent for RejectingValidator {
        fn agent_type(&self) -> AgentType {
            AgentType::CodeValidator
        }

        async fn execute(
            &self,
            _job: &ConstructionJob,
            _ctx: &ExecutionContext,
        ) -> Result<AgentOutcome, AgentError> {
            Ok(AgentOutcome::Validation(ValidationReport {
                valid: false,
                issues: vec![toolsmith_types::job::ValidationIssue {
                    category: toolsmith_types::job::IssueCategory::Structure,
                    severity: toolsmith_types::job::IssueSeverity::Error,
                    description: "component missing root element".to_string(),
                    code_excerpt: None,
                }],
            }))
        }
    }

    #[tokio::test]
    async fn exhausted_repair_fails_at_validation_step() {
        let registry = AgentRegistry::build(|agent| {
            if agent == AgentType::CodeValidator {
                BoxConstructionAgent::new(RejectingValidator)
            } else {
                BoxConstructionAgent::new(ScriptedAgent::new(agent))
            }
        });
        let repo = Arc::new(InMemoryJobRepository::new());
        let orch = orchestrator(Arc::clone(&repo), registry);

        let input = roi_job();
        let job_id = input.id;
        let err = orch.run(input).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StepFailed {
                step: PipelineStep::ValidatingCode,
                source: AgentError::ValidationExhausted { .. },
            }
        ));

        let stored = repo.get(job_id, "alice").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.current_step, PipelineStep::ValidatingCode);
        // The last issue list is retained.
        let report = stored.validation.as_ref().unwrap();
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 1);
        // Earlier steps remain completed.
        assert_eq!(
            stored.step_state(PipelineStep::AssemblingComponent),
            StepState::Completed
        );
        // The finalizer never ran.
        assert!(stored.finalized.is_none());
    }

    #[tokio::test]
    async fn snapshots_reflect_prefix_consistency() {
        let repo = Arc::new(InMemoryJobRepository::new());
        let orch = orchestrator(Arc::clone(&repo), scripted_registry());
        let mut rx = orch.bus.subscribe();

        orch.run(roi_job()).await.unwrap();

        while let Ok(event) = rx.try_recv() {
            if let ProgressEvent::JobSnapshot { job, .. } = event {
                let position = job.current_step.position();
                // Every step up to and including the current one is completed;
                // nothing later has started.
                for step in PipelineStep::SEQUENCE {
                    if step.position() <= position {
                        assert_eq!(job.step_state(step), StepState::Completed);
                    } else {
                        assert_eq!(job.step_state(step), StepState::Pending);
                    }
                }
            }
        }
    }
}
