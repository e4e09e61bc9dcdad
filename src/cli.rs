//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "stack-gateway")]
#[command(about = "Router config compiler, service topology and path-mounting gateway", long_about = None)]
pub struct Cli {
    /// Stack configuration file.
    #[arg(short, long, default_value = "stack.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Validate settings and write the router config file
    Compile {
        /// Output path (defaults to `litellm.output_path`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the service graph as JSON followed by its start order
    Topology,
    /// Write the router config, then run the gateway until SIGINT/SIGTERM
    Serve,
}

impl Cli {
    /// The subcommand to run; `serve` when none is given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
