//! Grandma CLI and HTTP API entry point.
//!
//! Binary name: `grandma`
//!
//! Parses CLI arguments, wires the database and services, then either
//! dispatches a CLI command or starts the HTTP server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use grandma_observe::tracing_setup::{DEFAULT_FILTER, LogFormat, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "grandma", &mut std::io::stdout());
        return Ok(());
    }

    let serving = matches!(cli.command, Commands::Serve { .. });
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 if serving => DEFAULT_FILTER,
        0 => "warn",
        1 => "info,grandma_core=debug,grandma_infra=debug,grandma_api=debug",
        _ => "trace",
    };
    let (format, otel) = match &cli.command {
        Commands::Serve {
            log_format, otel, ..
        } => (LogFormat::parse(log_format), *otel),
        _ => (LogFormat::Pretty, false),
    };
    init_tracing(format, filter, otel).map_err(|e| anyhow::anyhow!(e))?;

    let state = AppState::init().await?;

    let result = run(cli, state.clone()).await;

    state.drain_streams().await;
    state.db_pool.close().await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, state: AppState) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { host, port, .. } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            tracing::info!(%addr, data_dir = %state.data_dir.display(), "grandma API listening");
            if !cli.quiet {
                println!(
                    "  {} Grandma API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let shutdown = state.shutdown.clone();
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    shutdown_signal().await;
                    // In-flight streams stop reading and finalize what they have.
                    shutdown.cancel();
                })
                .await?;

            tracing::info!("server stopped");
        }

        Commands::Chat {
            model,
            conversation,
            message,
        } => {
            cli::chat::send_message(&state, &model, conversation, &message, cli.json).await?;
        }

        Commands::List { page, page_size } => {
            cli::conversation::list_conversations(&state, page, page_size, cli.json).await?;
        }

        Commands::Show { id } => {
            cli::conversation::show_conversation(&state, &id, cli.json).await?;
        }

        Commands::Delete { id, force } => {
            cli::conversation::delete_conversation(&state, &id, force, cli.json).await?;
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
