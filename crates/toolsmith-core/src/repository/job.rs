//! Job store trait definition.
//!
//! Defines the persistence interface for construction job records. The
//! infrastructure layer (toolsmith-infra) implements this trait with SQLite;
//! tests use the in-memory implementation.
//!
//! The orchestrator is the single writer per job, so `put` may be
//! last-writer-wins without further coordination.

use toolsmith_types::error::RepositoryError;
use toolsmith_types::job::ConstructionJob;
use uuid::Uuid;

/// Repository trait for job persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait JobRepository: Send + Sync {
    /// Upsert a job record (insert or replace by id).
    fn put(
        &self,
        job: &ConstructionJob,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch a job by id, scoped to its owning user.
    fn get(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ConstructionJob>, RepositoryError>> + Send;

    /// List a user's jobs, most recently updated first.
    fn list_for_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ConstructionJob>, RepositoryError>> + Send;

    /// Jobs left `InProgress` (e.g. after a crash); observation only, the
    /// pipeline does not resume execution from cold storage.
    fn list_unfinished(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ConstructionJob>, RepositoryError>> + Send;
}
