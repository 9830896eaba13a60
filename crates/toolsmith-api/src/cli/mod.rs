//! CLI argument definitions.

pub mod job;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Toolsmith: an agent pipeline that turns tool descriptions into runnable
/// UI component descriptions.
#[derive(Debug, Parser)]
#[command(name = "tsmith", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit machine-readable JSON instead of styled output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans via OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value_t = 8787)]
        port: u16,
        /// Host to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Submit a construction job and follow it to completion.
    Submit {
        /// Free-text description of the tool to build.
        description: String,
        /// Intended audience.
        #[arg(long)]
        audience: Option<String>,
        /// Industry context.
        #[arg(long)]
        industry: Option<String>,
        /// Requested feature (repeatable).
        #[arg(long = "feature")]
        features: Vec<String>,
        /// Job-wide model override.
        #[arg(long)]
        model: Option<String>,
        /// User the job belongs to.
        #[arg(long)]
        user: Option<String>,
    },

    /// Show the current record of one job.
    Status {
        job_id: Uuid,
        /// User the job belongs to.
        #[arg(long)]
        user: Option<String>,
    },

    /// List recent jobs.
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// User whose jobs to list.
        #[arg(long)]
        user: Option<String>,
    },
}
