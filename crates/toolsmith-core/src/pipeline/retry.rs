//! Retry controller: bound and adapt repeated attempts of one invocation.
//!
//! Wraps a single [`AgentInvoker::execute`] call with a per-agent attempt
//! budget, backoff between attempts, and attempt-numbered adaptation
//! (validation-focused, then conservative, then aggressive with an optional
//! fallback model). Every attempt lands in the job's execution history;
//! every failed attempt additionally lands in its retry history.
//!
//! The controller never downgrades an exhausted step to "skipped": after the
//! last attempt the last error is raised to the orchestrator unchanged.

use chrono::Utc;
use toolsmith_types::agent::AgentType;
use toolsmith_types::error::AgentError;
use toolsmith_types::job::{AgentExecutionRecord, ConstructionJob, RetryAttemptRecord};
use toolsmith_types::retry::AdaptationStrategy;

use crate::agent::AgentOutcome;
use crate::pipeline::record::JobRecordExt;

use super::invoker::AgentInvoker;
use super::resolver::ExecutionContext;

/// Bounded, adapting retry around one agent invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryController;

impl RetryController {
    pub fn new() -> Self {
        Self
    }

    /// Run `agent` until it succeeds or the attempt budget is exhausted.
    ///
    /// Always returns the job record: on success it carries the new payload
    /// and history; on failure it carries the accumulated retry history so
    /// the orchestrator can persist a faithful account of what was tried.
    /// Contract violations abort immediately without burning attempts.
    pub async fn execute(
        &self,
        invoker: &AgentInvoker,
        agent: AgentType,
        base_ctx: &ExecutionContext,
        mut job: ConstructionJob,
    ) -> (ConstructionJob, Result<AgentOutcome, AgentError>) {
        let max = base_ctx.retry.max_attempts.max(1);
        let mut last_err: Option<AgentError> = None;

        for attempt in 1..=max {
            let mut ctx = base_ctx.clone();
            ctx.attempt = attempt;
            // A sub-loop may hand in an escalated baseline; never weaken it.
            ctx.adaptation = base_ctx
                .adaptation
                .max(AdaptationStrategy::for_attempt(attempt, max));
            if attempt == max {
                // Final attempt: optionally switch to the first fallback model.
                if let Some(fallback) = base_ctx.retry.fallback_models.first() {
                    ctx.model = fallback.clone();
                }
            }

            let started_at = Utc::now();
            match invoker.execute(agent, &ctx, &job).await {
                Ok((outcome, mut updated)) => {
                    updated.record_execution(AgentExecutionRecord {
                        agent,
                        model: ctx.model,
                        attempt,
                        started_at,
                        completed_at: Utc::now(),
                        success: true,
                        error: None,
                    });
                    return (updated, Ok(outcome));
                }
                Err(err) => {
                    job.record_execution(AgentExecutionRecord {
                        agent,
                        model: ctx.model.clone(),
                        attempt,
                        started_at,
                        completed_at: Utc::now(),
                        success: false,
                        error: Some(err.to_string()),
                    });

                    if err.is_contract_violation() {
                        // A missing dependency is a defect; retrying cannot fix it.
                        return (job, Err(err));
                    }

                    job.record_retry(RetryAttemptRecord {
                        agent,
                        attempt,
                        strategy: ctx.adaptation.label().to_string(),
                        model: ctx.model,
                        error: err.to_string(),
                        at: Utc::now(),
                    });

                    tracing::warn!(
                        job_id = %job.id,
                        agent = %agent,
                        attempt,
                        max_attempts = max,
                        error = %err,
                        "agent attempt failed"
                    );

                    last_err = Some(err);

                    if attempt < max {
                        let delay = base_ctx
                            .retry
                            .backoff
                            .delay(base_ctx.retry.base_delay(), attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let err = last_err.unwrap_or_else(|| {
            AgentError::MalformedOutput("retry loop completed without an attempt".to_string())
        });
        (job, Err(err))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
