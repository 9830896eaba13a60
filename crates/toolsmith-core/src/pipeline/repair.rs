//! Validate-then-fix sub-loop.
//!
//! Producing an invalid artifact is an expected, recoverable condition
//! distinct from agent failure. The loop alternates the code-validator and
//! the repairing agent (the component-assembler re-run against the recorded
//! issue list) until validation passes or the cycle budget is exhausted.
//! The last fix cycle runs with the aggressive adaptation so the repairing
//! agent is maximally thorough.
//!
//! On exhaustion the job keeps the last artifact plus the still-open issue
//! list, and the error raised is treated by the orchestrator as a step
//! failure; broken output is never passed through silently.

use chrono::Utc;
use toolsmith_types::agent::AgentType;
use toolsmith_types::error::AgentError;
use toolsmith_types::job::{ConstructionJob, RetryAttemptRecord, ValidationReport};
use toolsmith_types::retry::AdaptationStrategy;

use crate::agent::AgentOutcome;
use crate::pipeline::record::JobRecordExt;

use super::invoker::AgentInvoker;
use super::resolver::ExecutionContext;
use super::retry::RetryController;

/// Bounded validate-then-fix loop for the validation step.
#[derive(Debug, Clone, Copy)]
pub struct RepairLoop {
    max_attempts: u32,
}

impl RepairLoop {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run validation, repairing between failed cycles.
    ///
    /// Idempotent on an already-valid artifact: the first passing validation
    /// returns immediately with zero fix cycles. Each fix cycle appends one
    /// entry to the validator's retry history.
    pub async fn run(
        &self,
        retry: &RetryController,
        invoker: &AgentInvoker,
        validate_ctx: &ExecutionContext,
        fix_ctx: &ExecutionContext,
        mut job: ConstructionJob,
    ) -> (ConstructionJob, Result<ValidationReport, AgentError>) {
        for cycle in 1..=self.max_attempts {
            let (next, result) = retry
                .execute(invoker, AgentType::CodeValidator, validate_ctx, job)
                .await;
            job = next;

            let report = match result {
                Ok(AgentOutcome::Validation(report)) => report,
                Ok(other) => {
                    // The invoker already rejects mismatched outcomes; this
                    // arm guards the enum exhaustively.
                    let err = AgentError::MalformedOutput(format!(
                        "validator returned a payload for {}",
                        other.agent()
                    ));
                    return (job, Err(err));
                }
                Err(err) => return (job, Err(err)),
            };

            if report.valid {
                tracing::debug!(
                    job_id = %job.id,
                    cycle,
                    "artifact validated"
                );
                return (job, Ok(report));
            }

            if cycle == self.max_attempts {
                let err = AgentError::ValidationExhausted {
                    attempts: self.max_attempts,
                    open_issues: report.issues.len(),
                };
                // The last report (with its open issues) stays on the record.
                return (job, Err(err));
            }

            tracing::info!(
                job_id = %job.id,
                cycle,
                issues = report.issues.len(),
                "validation failed, attempting repair"
            );

            job.record_retry(RetryAttemptRecord {
                agent: AgentType::CodeValidator,
                attempt: cycle,
                strategy: "fix_cycle".to_string(),
                model: fix_ctx.model.clone(),
                error: summarize_issues(&report),
                at: Utc::now(),
            });

            // Repair: the assembler re-runs with the failing artifact and the
            // issue list present on the record. The cycle after this one is
            // the last when `cycle + 1 == max_attempts`.
            let mut repair_ctx = fix_ctx.clone();
            repair_ctx.adaptation = if cycle + 1 >= self.max_attempts {
                AdaptationStrategy::Aggressive
            } else {
                AdaptationStrategy::ValidationFocused
            };

            let (next, result) = retry
                .execute(invoker, AgentType::ComponentAssembler, &repair_ctx, job)
                .await;
            job = next;

            if let Err(err) = result {
                return (job, Err(err));
            }
        }

        // Unreachable: every path in the loop returns.
        let err = AgentError::ValidationExhausted {
            attempts: self.max_attempts,
            open_issues: job.validation.as_ref().map_or(0, |r| r.issues.len()),
        };
        (job, Err(err))
    }
}

fn summarize_issues(report: &ValidationReport) -> String {
    let mut parts: Vec<String> = report
        .issues
        .iter()
        .take(3)
        .map(|issue| format!("{:?}: {}", issue.category, issue.description))
        .collect();
    if report.issues.len() > 3 {
        parts.push(format!("(+{} more)", report.issues.len() - 3));
    }
    parts.join("; ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::scripted::ScriptedAgent;
    use crate::agent::{AgentRegistry, BoxConstructionAgent, ConstructionAgent};
    use crate::pipeline::record::new_job;
    use crate::pipeline::resolver::{ModelResolver, PolicyTable};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use toolsmith_types::job::{
        AssembledComponent, IssueCategory, IssueSeverity, ToolRequest, ValidationIssue,
    };
    use toolsmith_types::retry::{BackoffStrategy, RetryPolicy};

    fn job_with_artifact() -> ConstructionJob {
        let mut job = new_job(
            "tester",
            ToolRequest {
                description: "a savings estimator".to_string(),
                target_audience: None,
                industry: None,
                features: Vec::new(),
                brainstorm: None,
            },
            "gpt-4o",
            Default::default(),
            None,
        );
        job.assembled = Some(AssembledComponent {
            component_code: "export default function Tool() { return null; }".to_string(),
        });
        job
    }

    fn contexts(job: &ConstructionJob) -> (ExecutionContext, ExecutionContext) {
        let table = PolicyTable::default();
        let mut validate = ModelResolver::resolve(AgentType::CodeValidator, job, &table);
        let mut fix = ModelResolver::resolve(AgentType::ComponentAssembler, job, &table);
        let fast = RetryPolicy {
            max_attempts: 2,
            backoff: BackoffStrategy::Fixed,
            base_delay_ms: 1,
            fallback_models: Vec::new(),
        };
        validate.retry = fast.clone();
        fix.retry = fast;
        (validate, fix)
    }

    fn sample_issues() -> Vec<ValidationIssue> {
        vec![
            ValidationIssue {
                category: IssueCategory::Syntax,
                severity: IssueSeverity::Error,
                description: "unbalanced tag".to_string(),
                code_excerpt: None,
            },
            ValidationIssue {
                category: IssueCategory::EventBinding,
                severity: IssueSeverity::Error,
                description: "onClick handler missing".to_string(),
                code_excerpt: None,
            },
        ]
    }

    /// Validator that rejects the artifact until it has been repaired
    /// `passes_after` times.
    struct CountingValidator {
        calls: AtomicU32,
        passes_from: u32,
    }

    impl ConstructionAgent for CountingValidator {
        fn agent_type(&self) -> AgentType {
            AgentType::CodeValidator
        }

        async fn execute(
            &self,
            _job: &ConstructionJob,
            _ctx: &ExecutionContext,
        ) -> Result<AgentOutcome, AgentError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.passes_from {
                Ok(AgentOutcome::Validation(ValidationReport {
                    valid: true,
                    issues: Vec::new(),
                }))
            } else {
                Ok(AgentOutcome::Validation(ValidationReport {
                    valid: false,
                    issues: sample_issues(),
                }))
            }
        }
    }

    fn invoker_with_validator(passes_from: u32) -> AgentInvoker {
        let slot = std::sync::Mutex::new(Some(CountingValidator {
            calls: AtomicU32::new(0),
            passes_from,
        }));
        let registry = AgentRegistry::build(move |a| {
            if a == AgentType::CodeValidator {
                if let Some(inner) = slot.lock().unwrap().take() {
                    return BoxConstructionAgent::new(inner);
                }
            }
            BoxConstructionAgent::new(ScriptedAgent::new(a))
        });
        AgentInvoker::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn valid_artifact_returns_immediately_with_zero_fix_cycles() {
        let invoker = invoker_with_validator(1);
        let job = job_with_artifact();
        let (validate_ctx, fix_ctx) = contexts(&job);

        let (job, result) = RepairLoop::new(3)
            .run(
                &RetryController::new(),
                &invoker,
                &validate_ctx,
                &fix_ctx,
                job,
            )
            .await;

        assert!(result.unwrap().valid);
        assert_eq!(job.retry_count(AgentType::CodeValidator), 0);
    }

    #[tokio::test]
    async fn single_repair_cycle_then_passes() {
        // Fails once, passes on the second validation.
        let invoker = invoker_with_validator(2);
        let job = job_with_artifact();
        let (validate_ctx, fix_ctx) = contexts(&job);

        let (job, result) = RepairLoop::new(3)
            .run(
                &RetryController::new(),
                &invoker,
                &validate_ctx,
                &fix_ctx,
                job,
            )
            .await;

        assert!(result.unwrap().valid);
        // Exactly one fix cycle recorded against the validator step.
        assert_eq!(job.retry_count(AgentType::CodeValidator), 1);
        assert_eq!(job.retry_history[0].strategy, "fix_cycle");
        assert!(job.retry_history[0].error.contains("unbalanced tag"));
    }

    #[tokio::test]
    async fn exhausted_repair_keeps_last_issue_list() {
        // Never passes.
        let invoker = invoker_with_validator(u32::MAX);
        let job = job_with_artifact();
        let (validate_ctx, fix_ctx) = contexts(&job);

        let (job, result) = RepairLoop::new(3)
            .run(
                &RetryController::new(),
                &invoker,
                &validate_ctx,
                &fix_ctx,
                job,
            )
            .await;

        match result {
            Err(AgentError::ValidationExhausted {
                attempts,
                open_issues,
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(open_issues, 2);
            }
            other => panic!("expected ValidationExhausted, got {other:?}"),
        }
        // The failing report is retained on the record.
        let report = job.validation.as_ref().unwrap();
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 2);
        // Two fix cycles ran (cycles 1 and 2; cycle 3 exhausted).
        assert_eq!(job.retry_count(AgentType::CodeValidator), 2);
    }

    #[tokio::test]
    async fn last_fix_cycle_is_aggressive() {
        // Track the adaptation the assembler sees on each repair.
        struct RecordingAssembler {
            seen: Arc<std::sync::Mutex<Vec<AdaptationStrategy>>>,
        }

        impl ConstructionAgent for RecordingAssembler {
            fn agent_type(&self) -> AgentType {
                AgentType::ComponentAssembler
            }

            async fn execute(
                &self,
                job: &ConstructionJob,
                ctx: &ExecutionContext,
            ) -> Result<AgentOutcome, AgentError> {
                self.seen.lock().unwrap().push(ctx.adaptation);
                Ok(AgentOutcome::Assembled(AssembledComponent {
                    component_code: job
                        .assembled
                        .as_ref()
                        .map(|a| a.component_code.clone())
                        .unwrap_or_default(),
                }))
            }
        }

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let validator_slot = std::sync::Mutex::new(Some(CountingValidator {
            calls: AtomicU32::new(0),
            passes_from: u32::MAX,
        }));
        let registry = AgentRegistry::build(move |a| match a {
            AgentType::CodeValidator => {
                if let Some(inner) = validator_slot.lock().unwrap().take() {
                    BoxConstructionAgent::new(inner)
                } else {
                    BoxConstructionAgent::new(ScriptedAgent::new(a))
                }
            }
            AgentType::ComponentAssembler => BoxConstructionAgent::new(RecordingAssembler {
                seen: Arc::clone(&seen_clone),
            }),
            _ => BoxConstructionAgent::new(ScriptedAgent::new(a)),
        });
        let invoker = AgentInvoker::new(Arc::new(registry));

        let job = job_with_artifact();
        let (validate_ctx, fix_ctx) = contexts(&job);

        let (_job, result) = RepairLoop::new(3)
            .run(
                &RetryController::new(),
                &invoker,
                &validate_ctx,
                &fix_ctx,
                job,
            )
            .await;

        assert!(result.is_err());
        let adaptations = seen.lock().unwrap().clone();
        assert_eq!(
            adaptations,
            vec![
                AdaptationStrategy::ValidationFocused,
                AdaptationStrategy::Aggressive
            ]
        );
    }

    #[test]
    fn summarize_issues_truncates() {
        let mut issues = sample_issues();
        issues.extend(sample_issues());
        let report = ValidationReport {
            valid: false,
            issues,
        };
        let summary = summarize_issues(&report);
        assert!(summary.contains("(+1 more)"));
    }
}
