//! The construction job record and its step payloads.
//!
//! `ConstructionJob` is the single mutable aggregate threaded through the
//! pipeline: user input, orchestration state, per-step result payloads,
//! execution/retry history, and timestamps. It is persisted as a whole after
//! every step so any observer can reconstruct job progress from cold storage.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{AgentType, PipelineStep};

// ---------------------------------------------------------------------------
// User input
// ---------------------------------------------------------------------------

/// The user's description of the tool to construct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Free-text description of the tool (e.g. "an ROI calculator").
    pub description: String,
    /// Intended audience, if stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    /// Industry context, if stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Requested features.
    #[serde(default)]
    pub features: Vec<String>,
    /// Structured ideation payload produced upstream; treated as opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brainstorm: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Overall status of a construction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Status of an individual pipeline step within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// Step payloads
// ---------------------------------------------------------------------------

/// A single planned function signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    pub returns: String,
    #[serde(default)]
    pub description: String,
}

/// Output of the function-planner agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSignaturePlan {
    pub signatures: Vec<FunctionSignature>,
}

/// A single state variable in the designed state model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateVariable {
    pub name: String,
    /// Declared type (e.g. "number", "string[]").
    pub var_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<serde_json::Value>,
    #[serde(default)]
    pub description: String,
}

/// Output of the state-design agent. Refined over multiple passes until the
/// agent reports the design complete or the pass cap is hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateLogicDesign {
    pub state_variables: Vec<StateVariable>,
    pub logic_description: String,
    /// Agent-reported stability flag; the refinement loop's default
    /// stopping condition.
    #[serde(default)]
    pub design_complete: bool,
}

/// Output of the jsx-layout agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDesign {
    pub jsx: String,
    #[serde(default)]
    pub structure_notes: String,
}

/// Output of the tailwind-styling agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylingSpec {
    pub styled_jsx: String,
    #[serde(default)]
    pub color_scheme: Vec<String>,
}

/// Output of the component-assembler agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledComponent {
    pub component_code: String,
}

/// Category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Syntax,
    StateManagement,
    EventBinding,
    Accessibility,
    Structure,
}

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// A single structural issue found by the code-validator agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub category: IssueCategory,
    pub severity: IssueSeverity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_excerpt: Option<String>,
}

/// Output of the code-validator agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Number of error-severity issues.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count()
    }
}

/// Output of the tool-finalizer agent: the finished tool description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedTool {
    pub title: String,
    pub summary: String,
    pub component_code: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// History records
// ---------------------------------------------------------------------------

/// One agent invocation, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecutionRecord {
    pub agent: AgentType,
    pub model: String,
    /// 1-based attempt number within the owning retry loop.
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One failed attempt recorded by the retry controller, with the adaptation
/// applied on the attempt that followed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttemptRecord {
    pub agent: AgentType,
    /// 1-based attempt number that failed.
    pub attempt: u32,
    /// Adaptation strategy label for the failed attempt.
    pub strategy: String,
    pub model: String,
    pub error: String,
    pub at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ConstructionJob
// ---------------------------------------------------------------------------

/// The job record threaded through the pipeline for one tool-creation
/// request.
///
/// Mutated exclusively by the orchestrator (and the agent it is currently
/// invoking); once `status` is terminal the record is read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionJob {
    /// UUIDv7, stable for the job's lifetime.
    pub id: Uuid,
    pub user_id: String,

    pub request: ToolRequest,

    pub status: JobStatus,
    pub current_step: PipelineStep,
    pub step_states: HashMap<PipelineStep, StepState>,

    /// Job-wide default model identifier.
    pub default_model: String,
    /// Per-agent model overrides.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub model_overrides: HashMap<AgentType, String>,

    // Per-step result payloads, attached as steps complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_plan: Option<FunctionSignaturePlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_design: Option<StateLogicDesign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutDesign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styling: Option<StylingSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembled: Option<AssembledComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized: Option<FinalizedTool>,

    #[serde(default)]
    pub execution_history: Vec<AgentExecutionRecord>,
    #[serde(default)]
    pub retry_history: Vec<RetryAttemptRecord>,
    /// Passes taken by the design-refinement loop (0 until that step runs).
    #[serde(default)]
    pub refinement_passes: u32,

    /// Failure message when `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConstructionJob {
    /// Whether the payload for a given step is present on the record.
    pub fn payload_present(&self, step: PipelineStep) -> bool {
        match step {
            PipelineStep::PlanningFunctionSignatures => self.function_plan.is_some(),
            PipelineStep::DesigningStateLogic => self.state_design.is_some(),
            PipelineStep::DesigningJsxLayout => self.layout.is_some(),
            PipelineStep::ApplyingTailwindStyling => self.styling.is_some(),
            PipelineStep::AssemblingComponent => self.assembled.is_some(),
            PipelineStep::ValidatingCode => self.validation.is_some(),
            PipelineStep::FinalizingTool => self.finalized.is_some(),
        }
    }

    /// The state of a step, defaulting to `Pending` when never touched.
    pub fn step_state(&self, step: PipelineStep) -> StepState {
        self.step_states
            .get(&step)
            .copied()
            .unwrap_or(StepState::Pending)
    }

    /// Number of retry-history entries recorded for one agent.
    pub fn retry_count(&self, agent: AgentType) -> usize {
        self.retry_history
            .iter()
            .filter(|r| r.agent == agent)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_job() -> ConstructionJob {
        let now = Utc::now();
        ConstructionJob {
            id: Uuid::now_v7(),
            user_id: "user-1".to_string(),
            request: ToolRequest {
                description: "An ROI calculator for marketing spend".to_string(),
                target_audience: Some("marketing managers".to_string()),
                industry: Some("saas".to_string()),
                features: vec!["currency input".to_string(), "chart".to_string()],
                brainstorm: Some(json!({"angle": "payback period"})),
            },
            status: JobStatus::Pending,
            current_step: PipelineStep::PlanningFunctionSignatures,
            step_states: HashMap::new(),
            default_model: "gpt-4o".to_string(),
            model_overrides: HashMap::from([(AgentType::CodeValidator, "gpt-4o-mini".to_string())]),
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

    #[test]
    fn test_job_json_roundtrip() {
        let job = sample_job();
        let json_str = serde_json::to_string(&job).unwrap();
        let parsed: ConstructionJob = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.id, job.id);
        assert_eq!(parsed.user_id, "user-1");
        assert_eq!(parsed.status, JobStatus::Pending);
        assert_eq!(
            parsed.model_overrides.get(&AgentType::CodeValidator),
            Some(&"gpt-4o-mini".to_string())
        );
    }

    #[test]
    fn test_step_states_serialize_as_string_keys() {
        let mut job = sample_job();
        job.step_states
            .insert(PipelineStep::PlanningFunctionSignatures, StepState::Completed);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(
            value["step_states"]["planning_function_signatures"],
            json!("completed")
        );
    }

    #[test]
    fn test_payload_present_tracks_each_slot() {
        let mut job = sample_job();
        assert!(!job.payload_present(PipelineStep::PlanningFunctionSignatures));

        job.function_plan = Some(FunctionSignaturePlan {
            signatures: vec![FunctionSignature {
                name: "computeRoi".to_string(),
                parameters: vec!["spend: number".to_string()],
                returns: "number".to_string(),
                description: String::new(),
            }],
        });
        assert!(job.payload_present(PipelineStep::PlanningFunctionSignatures));
        assert!(!job.payload_present(PipelineStep::FinalizingTool));
    }

    #[test]
    fn test_step_state_defaults_to_pending() {
        let job = sample_job();
        assert_eq!(
            job.step_state(PipelineStep::ValidatingCode),
            StepState::Pending
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_validation_report_error_count() {
        let report = ValidationReport {
            valid: false,
            issues: vec![
                ValidationIssue {
                    category: IssueCategory::Syntax,
                    severity: IssueSeverity::Error,
                    description: "unbalanced JSX tag".to_string(),
                    code_excerpt: Some("<div>".to_string()),
                },
                ValidationIssue {
                    category: IssueCategory::Accessibility,
                    severity: IssueSeverity::Warning,
                    description: "input lacks a label".to_string(),
                    code_excerpt: None,
                },
            ],
        };
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn test_retry_count_filters_by_agent() {
        let mut job = sample_job();
        let now = Utc::now();
        for attempt in 1..=2 {
            job.retry_history.push(RetryAttemptRecord {
                agent: AgentType::CodeValidator,
                attempt,
                strategy: "standard".to_string(),
                model: "gpt-4o".to_string(),
                error: "timeout".to_string(),
                at: now,
            });
        }
        job.retry_history.push(RetryAttemptRecord {
            agent: AgentType::StateDesign,
            attempt: 1,
            strategy: "standard".to_string(),
            model: "gpt-4o".to_string(),
            error: "timeout".to_string(),
            at: now,
        });

        assert_eq!(job.retry_count(AgentType::CodeValidator), 2);
        assert_eq!(job.retry_count(AgentType::StateDesign), 1);
        assert_eq!(job.retry_count(AgentType::JsxLayout), 0);
    }
}
