//! CLI job commands: submit, status, list.

use std::collections::HashMap;

use comfy_table::{Table, presets::UTF8_FULL};
use toolsmith_core::pipeline::record::new_job;
use toolsmith_core::repository::JobRepository;
use toolsmith_types::agent::PipelineStep;
use toolsmith_types::event::{ProgressEvent, StepProgressStatus};
use toolsmith_types::job::{ConstructionJob, JobStatus, StepState, ToolRequest};
use uuid::Uuid;

use crate::state::AppState;

/// Fallback user for CLI invocations.
const CLI_USER: &str = "cli";

/// Submit a job and follow its progress events until it terminates.
#[allow(clippy::too_many_arguments)]
pub async fn submit(
    state: &AppState,
    description: String,
    audience: Option<String>,
    industry: Option<String>,
    features: Vec<String>,
    model: Option<String>,
    user: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let user_id = user.unwrap_or_else(|| CLI_USER.to_string());
    let default_model = model.unwrap_or_else(|| state.config.default_model.clone());

    let job = new_job(
        user_id.clone(),
        ToolRequest {
            description,
            target_audience: audience,
            industry,
            features,
            brainstorm: None,
        },
        default_model,
        HashMap::new(),
        None,
    );

    // Subscribe before starting so no event is missed.
    let events = state.bus.subscribe();
    let job_id = state.manager.start(job).await?;

    if !json {
        println!();
        println!(
            "  {} Job {} started",
            console::style("⚒").bold(),
            console::style(job_id).cyan()
        );
        println!();
    }

    // Print progress lines in a side task; the join below is authoritative
    // (the manager's timeout path persists a failure without a bus event).
    let mut printer = tokio::spawn(follow_events(events, job_id, json));
    state.manager.await_job(job_id).await;
    let _ = tokio::time::timeout(std::time::Duration::from_millis(200), &mut printer).await;
    printer.abort();

    let record = state.repo.get(job_id, &user_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else if let Some(job) = record {
        print_job_summary(&job);
    }

    Ok(())
}

/// Show one job's record.
pub async fn status(
    state: &AppState,
    job_id: Uuid,
    user: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let user_id = user.unwrap_or_else(|| CLI_USER.to_string());
    let job = state
        .repo
        .get(job_id, &user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("job {job_id} not found for user '{user_id}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    print_job_summary(&job);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Step", "State", "Retries"]);
    for step in PipelineStep::SEQUENCE {
        table.add_row(vec![
            step.display_name().to_string(),
            state_label(job.step_state(step)),
            job.retry_count(step.agent()).to_string(),
        ]);
    }
    println!("{table}");

    Ok(())
}

/// List recent jobs for a user.
pub async fn list(
    state: &AppState,
    limit: u32,
    user: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let user_id = user.unwrap_or_else(|| CLI_USER.to_string());
    let jobs = state.repo.list_for_user(&user_id, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    if jobs.is_empty() {
        println!("No jobs for user '{user_id}'.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Job", "Status", "Current step", "Description", "Updated"]);
    for job in &jobs {
        table.add_row(vec![
            job.id.to_string(),
            status_label(job.status),
            job.current_step.display_name().to_string(),
            truncate(&job.request.description, 40),
            job.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    println!("{table}");

    Ok(())
}

/// Print this job's progress events until a terminal one arrives.
async fn follow_events(
    mut events: tokio::sync::broadcast::Receiver<ProgressEvent>,
    job_id: Uuid,
    json: bool,
) {
    loop {
        match events.recv().await {
            Ok(event) if event.job_id() == job_id => match event {
                ProgressEvent::StepProgress {
                    status, message, ..
                } => {
                    if !json && status != StepProgressStatus::Started {
                        let mark = match status {
                            StepProgressStatus::Completed => console::style("✓").green(),
                            StepProgressStatus::Failed => console::style("✗").red(),
                            StepProgressStatus::Started => console::style("…").dim(),
                        };
                        println!("  {mark} {message}");
                    }
                }
                ProgressEvent::JobCompleted { duration_ms, .. } => {
                    if !json {
                        println!();
                        println!(
                            "  {} Completed in {}ms",
                            console::style("✓").green().bold(),
                            duration_ms
                        );
                    }
                    break;
                }
                ProgressEvent::JobFailed { step, error, .. } => {
                    if !json {
                        println!();
                        println!(
                            "  {} Failed at {}: {}",
                            console::style("✗").red().bold(),
                            step.display_name(),
                            error
                        );
                    }
                    break;
                }
                ProgressEvent::JobSnapshot { .. } => {}
            },
            Ok(_) => {}
            // A lagged subscriber misses some lines; the final read in the
            // caller still reports the authoritative record.
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_job_summary(job: &ConstructionJob) {
    println!();
    println!(
        "  Job {}  [{}]",
        console::style(job.id).cyan(),
        status_label(job.status)
    );
    println!("  {}", job.request.description);
    if let Some(error) = &job.error {
        println!("  {} {}", console::style("error:").red(), error);
    }
    if job.refinement_passes > 0 {
        println!("  refinement passes: {}", job.refinement_passes);
    }
    if let Some(finalized) = &job.finalized {
        println!(
            "  final artifact: {} ({} bytes)",
            finalized.title,
            finalized.component_code.len()
        );
    }
    println!();
}

fn status_label(status: JobStatus) -> String {
    match status {
        JobStatus::Pending => console::style("pending").dim().to_string(),
        JobStatus::InProgress => console::style("in progress").yellow().to_string(),
        JobStatus::Completed => console::style("completed").green().to_string(),
        JobStatus::Failed => console::style("failed").red().to_string(),
    }
}

fn state_label(state: StepState) -> String {
    match state {
        StepState::Pending => "pending".to_string(),
        StepState::InProgress => "in progress".to_string(),
        StepState::Completed => "completed".to_string(),
        StepState::Failed => "failed".to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn truncate_shortens_long_text() {
        let out = truncate("a very long tool description indeed", 10);
        assert!(out.chars().count() <= 10);
        assert!(out.ends_with('…'));
    }
}
