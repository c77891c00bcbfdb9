//! CLI command definitions for the `memora` binary.

pub mod definition;
pub mod run;
pub mod snapshot;
pub mod sweep;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run schema-validated, cached LLM agents.
#[derive(Parser)]
#[command(name = "memora", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "MEMORA_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute an agent.
    Run(run::RunArgs),

    /// Inspect agent definitions.
    Definition {
        #[command(subcommand)]
        action: DefinitionCommand,
    },

    /// Manage cached snapshots.
    Snapshot {
        #[command(subcommand)]
        action: SnapshotCommand,
    },

    /// Delete expired snapshots, once or periodically.
    Sweep {
        /// Repeat every N seconds until Ctrl+C (config interval when no value).
        #[arg(long, value_name = "SECS", num_args = 0..=1)]
        every: Option<Option<u64>>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum DefinitionCommand {
    /// List agents found under the definitions directory.
    #[command(alias = "ls")]
    List,

    /// Print the directory holding an agent's definition.
    Path {
        /// Agent id.
        agent: String,
    },

    /// Load an agent's definition and print a summary.
    Show {
        /// Agent id.
        agent: String,
    },
}

#[derive(Subcommand)]
pub enum SnapshotCommand {
    /// Delete one snapshot by id.
    Invalidate {
        /// Snapshot id (UUID).
        id: uuid::Uuid,
    },
}
