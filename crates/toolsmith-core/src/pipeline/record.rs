//! Job record lifecycle helpers.
//!
//! `ConstructionJob` lives in `toolsmith-types`; this module provides the
//! constructor and an extension trait with the state transitions the
//! orchestrator is allowed to make. The extension trait pattern is used
//! because Rust does not allow inherent impls for types defined in another
//! crate.

use std::collections::HashMap;

use chrono::Utc;
use toolsmith_types::agent::{AgentType, PipelineStep};
use toolsmith_types::job::{
    AgentExecutionRecord, ConstructionJob, JobStatus, RetryAttemptRecord, StepState, ToolRequest,
};
use uuid::Uuid;

/// Create a fresh job record for a tool-construction request.
///
/// Starts `Pending` at the first pipeline step with every payload slot
/// empty. `id` may be supplied by the caller (idempotent restarts of the
/// start endpoint); otherwise a UUIDv7 is assigned.
pub fn new_job(
    user_id: impl Into<String>,
    request: ToolRequest,
    default_model: impl Into<String>,
    model_overrides: HashMap<AgentType, String>,
    id: Option<Uuid>,
) -> ConstructionJob {
    let now = Utc::now();
    ConstructionJob {
        id: id.unwrap_or_else(Uuid::now_v7),
        user_id: user_id.into(),
        request,
        status: JobStatus::Pending,
        current_step: PipelineStep::PlanningFunctionSignatures,
        step_states: HashMap::new(),
        default_model: default_model.into(),
        model_overrides,
        function_plan: None,
        state_design: None,
        layout: None,
        styling: None,
        assembled: None,
        validation: None,
        finalized: None,
        execution_history: Vec::new(),
        retry_history: Vec::new(),
        refinement_passes: 0,
        error: None,
        created_at: now,
        updated_at: now,
    }
}

/// State transitions the orchestrator applies to a job record.
pub trait JobRecordExt {
    /// Enter a step: the job is `InProgress`, `current_step` moves to the
    /// step, and the step itself is marked `InProgress`.
    fn begin_step(&mut self, step: PipelineStep);

    /// Mark a step `Completed`.
    fn complete_step(&mut self, step: PipelineStep);

    /// Terminal failure at a step: the step and the job are both `Failed`
    /// and the error message is retained.
    fn fail_at(&mut self, step: PipelineStep, error: impl Into<String>);

    /// Terminal success: all steps done.
    fn complete_job(&mut self);

    fn record_execution(&mut self, record: AgentExecutionRecord);

    fn record_retry(&mut self, record: RetryAttemptRecord);

    /// Refresh `updated_at`.
    fn touch(&mut self);
}

impl JobRecordExt for ConstructionJob {
    fn begin_step(&mut self, step: PipelineStep) {
        self.status = JobStatus::InProgress;
        self.current_step = step;
        self.step_states.insert(step, StepState::InProgress);
        self.touch();
    }

    fn complete_step(&mut self, step: PipelineStep) {
        self.step_states.insert(step, StepState::Completed);
        self.touch();
    }

    fn fail_at(&mut self, step: PipelineStep, error: impl Into<String>) {
        self.step_states.insert(step, StepState::Failed);
        self.current_step = step;
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.touch();
    }

    fn complete_job(&mut self) {
        self.status = JobStatus::Completed;
        self.touch();
    }

    fn record_execution(&mut self, record: AgentExecutionRecord) {
        self.execution_history.push(record);
        self.touch();
    }

    fn record_retry(&mut self, record: RetryAttemptRecord) {
        self.retry_history.push(record);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
