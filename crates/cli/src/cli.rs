use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::commands::{ResolveOptions, analyze_command, resolve_command, targets_command};

/// Resolve the build target that runs a source location
#[derive(Parser, Debug)]
#[command(name = "runtarget")]
#[command(version, about, long_about = None)]
#[command(subcommand_required = true, arg_required_else_help = true)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the run configuration for a file or line
    #[command(visible_alias = "r")]
    Resolve {
        /// Source or BUILD file with optional line number (e.g., java/com/foo/FooTest.java:12)
        filepath: String,

        /// Target index to query (JSON)
        #[arg(short, long)]
        index: PathBuf,

        /// Workspace root (defaults to the closest directory with a MODULE.bazel or WORKSPACE)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Candidate to pick when several targets qualify, starting at 1
        #[arg(short, long)]
        choose: Option<usize>,

        /// Simulated latency of every index query, in milliseconds
        #[arg(long, default_value_t = 100)]
        latency_ms: u64,

        /// Print the configuration as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what the resolver sees at a file or line
    #[command(visible_alias = "a")]
    Analyze {
        /// Source or BUILD file with optional line number
        filepath: String,

        /// Workspace root (defaults to the closest directory with a MODULE.bazel or WORKSPACE)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Print the source context as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the targets of an index
    #[command(visible_alias = "t")]
    Targets {
        /// Target index to list (JSON)
        #[arg(short, long)]
        index: PathBuf,

        /// Print the index as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Execute the command
    pub fn execute(self) -> Result<()> {
        match self {
            Commands::Resolve {
                filepath,
                index,
                workspace,
                choose,
                latency_ms,
                json,
            } => resolve_command(&ResolveOptions {
                filepath,
                index,
                workspace,
                choose,
                latency: Duration::from_millis(latency_ms),
                json,
            }),
            Commands::Analyze {
                filepath,
                workspace,
                json,
            } => analyze_command(&filepath, workspace.as_deref(), json),
            Commands::Targets { index, json } => targets_command(&index, json),
        }
    }
}
