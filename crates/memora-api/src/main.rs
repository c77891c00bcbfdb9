//! Memora CLI entry point.
//!
//! Binary name: `memora`
//!
//! Parses CLI arguments, initializes tracing and application state, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, DefinitionCommand, SnapshotCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,memora=debug,memora_core=debug,memora_infra=debug",
        _ => "trace",
    };
    memora_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = dispatch(cli).await;
    memora_observe::tracing_setup::shutdown_tracing();
    result
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "memora", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    match cli.command {
        Commands::Run(args) => cli::run::run_agent(&state, args, cli.json).await?,

        Commands::Definition { action } => match action {
            DefinitionCommand::List => cli::definition::list_definitions(&state, cli.json).await?,
            DefinitionCommand::Path { agent } => {
                cli::definition::definition_path(&state, &agent, cli.json)?
            }
            DefinitionCommand::Show { agent } => {
                cli::definition::show_definition(&state, &agent, cli.json).await?
            }
        },

        Commands::Snapshot { action } => match action {
            SnapshotCommand::Invalidate { id } => {
                cli::snapshot::invalidate_snapshot(&state, &id, cli.json).await?
            }
        },

        Commands::Sweep { every } => {
            let every = every.map(|secs| secs.unwrap_or(state.config.sweep_interval_seconds));
            cli::sweep::sweep(&state, every, cli.json).await?
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
