//! Progress events broadcast during job execution.
//!
//! `ProgressEvent` is the unified event type pushed over the progress bus.
//! All variants are Clone + Send + Sync for use with tokio broadcast
//! channels. Delivery is fire-and-forget: emitting with no subscribers, or
//! to a lagging subscriber, never affects the pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{AgentType, PipelineStep};
use crate::job::ConstructionJob;

/// Lifecycle status carried by a step-progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepProgressStatus {
    Started,
    Completed,
    Failed,
}

/// Events emitted while a construction job runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A pipeline step changed state.
    StepProgress {
        job_id: Uuid,
        step: PipelineStep,
        status: StepProgressStatus,
        /// Human-readable message (display name plus detail).
        message: String,
        /// Optional step payload summary for observers.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },

    /// A full job-record snapshot after an agent mutated it.
    JobSnapshot {
        job_id: Uuid,
        job: Box<ConstructionJob>,
        source_agent: AgentType,
    },

    /// The job reached its terminal `Completed` state.
    JobCompleted { job_id: Uuid, duration_ms: u64 },

    /// The job reached its terminal `Failed` state.
    JobFailed {
        job_id: Uuid,
        step: PipelineStep,
        error: String,
    },
}

impl ProgressEvent {
    /// The job this event belongs to.
    pub fn job_id(&self) -> Uuid {
        match self {
            ProgressEvent::StepProgress { job_id, .. }
            | ProgressEvent::JobSnapshot { job_id, .. }
            | ProgressEvent::JobCompleted { job_id, .. }
            | ProgressEvent::JobFailed { job_id, .. } => *job_id,
        }
    }
}
