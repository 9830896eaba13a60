//! Job manager: supervised background construction tasks.
//!
//! Request handlers never fire-and-forget. The manager owns one supervised
//! tokio task per job with an explicit start/await/cancel contract: the
//! initial record is persisted before the task spawns (so the read path
//! finds it immediately), a whole-job timeout budget is enforced, panics in
//! the orchestrator are caught, and cancellation is cooperative via
//! `CancellationToken`. Every abnormal ending is persisted as a `Failed`
//! record so observers are never left with a stuck `InProgress` job.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toolsmith_types::error::RepositoryError;
use toolsmith_types::job::ConstructionJob;
use uuid::Uuid;

use crate::repository::JobRepository;

use super::orchestrator::{Orchestrator, PipelineError};
use super::record::JobRecordExt;

struct JobTask {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Process-wide supervisor for background construction tasks.
pub struct JobManager<R: JobRepository + 'static> {
    orchestrator: Arc<Orchestrator<R>>,
    repo: Arc<R>,
    job_timeout: Duration,
    tasks: Arc<DashMap<Uuid, JobTask>>,
}

impl<R: JobRepository + 'static> JobManager<R> {
    pub fn new(orchestrator: Arc<Orchestrator<R>>, repo: Arc<R>, job_timeout: Duration) -> Self {
        Self {
            orchestrator,
            repo,
            job_timeout,
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Persist the pending record and spawn the supervised task.
    ///
    /// Returns as soon as the record is visible to readers; no step has run
    /// yet when this returns.
    pub async fn start(&self, job: ConstructionJob) -> Result<Uuid, RepositoryError> {
        let job_id = job.id;
        let user_id = job.user_id.clone();
        self.repo.put(&job).await?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let orchestrator = Arc::clone(&self.orchestrator);
        let repo = Arc::clone(&self.repo);
        let tasks = Arc::clone(&self.tasks);
        let timeout = self.job_timeout;

        let handle = tokio::spawn(async move {
            enum Ending {
                Finished,
                Cancelled,
                TimedOut,
                Panicked,
                Aborted,
            }

            // The orchestrator runs in its own task so a panic inside it is
            // contained and observable as a JoinError here.
            let mut run = tokio::spawn(async move { orchestrator.run(job).await });

            let ending = tokio::select! {
                _ = token.cancelled() => Ending::Cancelled,
                joined = tokio::time::timeout(timeout, &mut run) => match joined {
                    Err(_) => Ending::TimedOut,
                    // Terminal outcome already persisted by the orchestrator
                    // (completed or failed -- both are Finished here).
                    Ok(Ok(_)) => Ending::Finished,
                    Ok(Err(join_err)) if join_err.is_panic() => Ending::Panicked,
                    Ok(Err(_)) => Ending::Aborted,
                },
            };

            let failure: Option<String> = match ending {
                Ending::Finished => None,
                Ending::Cancelled => {
                    run.abort();
                    Some(PipelineError::Cancelled.to_string())
                }
                Ending::TimedOut => {
                    run.abort();
                    Some(PipelineError::Timeout.to_string())
                }
                Ending::Panicked => Some("orchestrator panicked".to_string()),
                Ending::Aborted => Some("orchestrator task aborted".to_string()),
            };

            if let Some(message) = failure {
                mark_failed(repo.as_ref(), job_id, &user_id, &message).await;
            }

            tasks.remove(&job_id);
        });

        self.tasks.insert(
            job_id,
            JobTask {
                cancel,
                handle: Some(handle),
            },
        );

        tracing::info!(job_id = %job_id, "construction task started");
        Ok(job_id)
    }

    /// Join a running job's supervisor task. Returns `false` when the job is
    /// unknown or already finished.
    pub async fn await_job(&self, job_id: Uuid) -> bool {
        let handle = self
            .tasks
            .get_mut(&job_id)
            .and_then(|mut task| task.handle.take());
        match handle {
            Some(handle) => {
                let _ = handle.await;
                self.tasks.remove(&job_id);
                true
            }
            None => false,
        }
    }

    /// Request cooperative cancellation. Returns `false` when the job is
    /// unknown or already finished.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        match self.tasks.get(&job_id) {
            Some(task) => {
                task.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of live background tasks.
    pub fn running_count(&self) -> usize {
        self.tasks.len()
    }
}

/// Persist a `Failed` status for a job whose task ended abnormally.
///
/// Best effort: the record may already be terminal (the orchestrator
/// persisted its own failure first), in which case nothing is overwritten.
async fn mark_failed<R: JobRepository>(repo: &R, job_id: Uuid, user_id: &str, message: &str) {
    match repo.get(job_id, user_id).await {
        Ok(Some(mut job)) if !job.status.is_terminal() => {
            let step = job.current_step;
            job.fail_at(step, message);
            if let Err(err) = repo.put(&job).await {
                tracing::error!(job_id = %job_id, error = %err, "failed to persist abnormal job ending");
            }
        }
        Ok(_) => {}
        Err(err) => {
            tracing::error!(job_id = %job_id, error = %err, "failed to load job after abnormal ending");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
