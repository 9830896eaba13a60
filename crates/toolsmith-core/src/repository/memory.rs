//! In-memory job repository.
//!
//! Backs orchestrator tests and the CLI dry-run path. Concurrency-safe via
//! `DashMap`; ordering for list queries follows `updated_at` like the SQLite
//! implementation.

use dashmap::DashMap;
use toolsmith_types::error::RepositoryError;
use toolsmith_types::job::{ConstructionJob, JobStatus};
use uuid::Uuid;

use super::job::JobRepository;

/// DashMap-backed implementation of [`JobRepository`].
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: DashMap<Uuid, ConstructionJob>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl JobRepository for InMemoryJobRepository {
    async fn put(&self, job: &ConstructionJob) -> Result<(), RepositoryError> {
        self.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<ConstructionJob>, RepositoryError> {
        Ok(self
            .jobs
            .get(&id)
            .filter(|job| job.user_id == user_id)
            .map(|job| job.clone()))
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ConstructionJob>, RepositoryError> {
        let mut jobs: Vec<ConstructionJob> = self
            .jobs
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();
        jobs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        jobs.truncate(limit as usize);
        Ok(jobs)
    }

    async fn list_unfinished(&self) -> Result<Vec<ConstructionJob>, RepositoryError> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.status == JobStatus::InProgress)
            .map(|entry| entry.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::record::new_job;
    use toolsmith_types::job::ToolRequest;

    fn request() -> ToolRequest {
        ToolRequest {
            description: "a quiz".to_string(),
            target_audience: None,
            industry: None,
            features: Vec::new(),
            brainstorm: None,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let repo = InMemoryJobRepository::new();
        let job = new_job("alice", request(), "gpt-4o", Default::default(), None);
        repo.put(&job).await.unwrap();

        let fetched = repo.get(job.id, "alice").await.unwrap().unwrap();
        assert_eq!(fetched.id, job.id);
    }

    #[tokio::test]
    async fn get_scopes_by_user() {
        let repo = InMemoryJobRepository::new();
        let job = new_job("alice", request(), "gpt-4o", Default::default(), None);
        repo.put(&job).await.unwrap();

        assert!(repo.get(job.id, "mallory").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_for_user_respects_limit_and_order() {
        let repo = InMemoryJobRepository::new();
        for _ in 0..5 {
            let job = new_job("alice", request(), "gpt-4o", Default::default(), None);
            repo.put(&job).await.unwrap();
        }

        let listed = repo.list_for_user("alice", 3).await.unwrap();
        assert_eq!(listed.len(), 3);
        for pair in listed.windows(2) {
            assert!(pair[0].updated_at >= pair[1].updated_at);
        }
    }

    #[tokio::test]
    async fn list_unfinished_filters_by_status() {
        let repo = InMemoryJobRepository::new();
        let mut running = new_job("alice", request(), "gpt-4o", Default::default(), None);
        running.status = JobStatus::InProgress;
        repo.put(&running).await.unwrap();

        let done = new_job("alice", request(), "gpt-4o", Default::default(), None);
        repo.put(&done).await.unwrap();

        let unfinished = repo.list_unfinished().await.unwrap();
        assert_eq!(unfinished.len(), 1);
        assert_eq!(unfinished[0].id, running.id);
    }
}
