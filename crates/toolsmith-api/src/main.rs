//! Toolsmith CLI and REST API entry point.
//!
//! Binary name: `tsmith`
//!
//! Parses CLI arguments, initializes the database and the orchestration
//! services, then dispatches to the appropriate command handler or starts
//! the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing. --otel routes through the OpenTelemetry-enabled
    // subscriber; otherwise a plain fmt subscriber with verbosity mapping.
    if cli.otel {
        if let Err(err) = toolsmith_observe::tracing_setup::init_tracing(true) {
            eprintln!("failed to initialize tracing: {err}");
        }
    } else {
        let filter = match cli.verbose {
            0 => "warn",
            1 => "info,toolsmith=debug",
            _ => "trace",
        };
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_target(false)
            .init();
    }

    // Initialize application state (DB, orchestrator, job manager)
    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Toolsmith API listening on {}",
                console::style("⚒").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Submit {
            description,
            audience,
            industry,
            features,
            model,
            user,
        } => {
            cli::job::submit(
                &state,
                description,
                audience,
                industry,
                features,
                model,
                user,
                cli.json,
            )
            .await?;
        }

        Commands::Status { job_id, user } => {
            cli::job::status(&state, job_id, user, cli.json).await?;
        }

        Commands::Jobs { limit, user } => {
            cli::job::list(&state, limit, user, cli.json).await?;
        }
    }

    toolsmith_observe::tracing_setup::shutdown_tracing();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
