//! Application state wiring all services together.
//!
//! `AppState` holds the concrete instances used by both the CLI and the
//! REST API. The core is generic over repository/provider traits; AppState
//! pins it to the SQLite repository and, when an API key is configured, the
//! OpenAI-compatible provider. Without a key the service runs the scripted
//! agents (dry-run mode).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use toolsmith_core::agent::scripted::scripted_registry;
use toolsmith_core::event::ProgressBus;
use toolsmith_core::pipeline::{JobManager, Orchestrator};
use toolsmith_core::repository::JobRepository;
use toolsmith_infra::agents::build_registry;
use toolsmith_infra::config::{load_global_config, resolve_api_key, resolve_data_dir};
use toolsmith_infra::llm::OpenAiCompatProvider;
use toolsmith_infra::sqlite::{DatabasePool, SqliteJobRepository};
use toolsmith_types::config::GlobalConfig;

/// Concrete orchestrator type pinned to the SQLite repository.
pub type ConcreteOrchestrator = Orchestrator<SqliteJobRepository>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<JobManager<SqliteJobRepository>>,
    pub repo: Arc<SqliteJobRepository>,
    pub bus: ProgressBus,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: connect to the database, pick the
    /// agent backend, wire the orchestrator and job manager.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("toolsmith.db").display()
        );
        let pool = DatabasePool::new(&db_url).await?;
        let repo = Arc::new(SqliteJobRepository::new(pool));

        // Jobs a previous process left running can only be observed, not
        // resumed; surface them so operators notice.
        match repo.list_unfinished().await {
            Ok(stale) if !stale.is_empty() => {
                tracing::warn!(
                    count = stale.len(),
                    "jobs left in progress by a previous run"
                );
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "could not check for unfinished jobs"),
        }

        let bus = ProgressBus::new(1024);

        let registry = match resolve_api_key(&config) {
            Some(key) => {
                let provider = Arc::new(OpenAiCompatProvider::new(
                    config.provider.base_url.clone(),
                    SecretString::from(key),
                ));
                build_registry(provider)
            }
            None => {
                tracing::warn!(
                    "no provider API key configured; running with scripted agents"
                );
                scripted_registry()
            }
        };

        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&repo),
            bus.clone(),
            Arc::new(registry),
            &config,
        ));
        let manager = Arc::new(JobManager::new(
            orchestrator,
            Arc::clone(&repo),
            Duration::from_secs(config.job_timeout_secs),
        ));

        Ok(Self {
            manager,
            repo,
            bus,
            config,
            data_dir,
        })
    }
}
