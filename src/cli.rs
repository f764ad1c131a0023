//! CLI argument parsing for opforge.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// opforge - operation-tree builder and decision file tooling
#[derive(Parser, Debug)]
#[command(name = "opforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Print details while running
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and merge decision files
    Decisions(DecisionsArgs),

    /// Prepare a generation plan from a configuration file
    Plan(PlanArgs),

    /// Lower and run a built-in sample program
    Demo,
}

#[derive(Args, Debug)]
pub struct DecisionsArgs {
    /// Main decisions file
    pub main: PathBuf,

    /// Override decision files, merged after the main file in order
    #[arg(short = 'o', long = "override", value_name = "PATH")]
    pub overrides: Vec<PathBuf>,

    /// Print the merged decisions as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Generation configuration (JSON)
    pub config: PathBuf,

    /// File the configuration is declared in; relative paths resolve
    /// against its directory (defaults to the configuration itself)
    #[arg(long, value_name = "PATH")]
    pub artifact: Option<PathBuf>,

    /// Request execution tracing (also requested by OPFORGE_ENABLE_TRACING)
    #[arg(long)]
    pub tracing: bool,
}
