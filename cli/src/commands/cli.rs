use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "batchflow", version, about = "Run staged task documents with checkpoints")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; skips the default search (~/.batchflow/config.toml, ./batchflow.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a task document and print its batch plan without running anything.
    Plan(PlanArgs),
    /// Execute a task document, resuming from its checkpoint when possible.
    Run(RunArgs),
    /// Show the checkpoint summary for a task document.
    Status(StatusArgs),
    /// Delete the checkpoint for a task document.
    Clear(ClearArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    pub file: PathBuf,

    /// text | jsonl
    #[arg(long)]
    pub format: Option<String>,

    /// Fail on any unresolvable `@path` inclusion.
    #[arg(long)]
    pub strict: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    pub file: PathBuf,

    /// Discard the existing checkpoint and start from the first stage.
    #[arg(long)]
    pub restart: bool,

    /// Requested concurrent tasks per batch.
    #[arg(short = 'p', long = "parallel")]
    pub parallel: Option<usize>,

    /// Hard ceiling on concurrent tasks; the smaller of this and `-p` wins.
    #[arg(long = "max-parallel")]
    pub max_parallel: Option<usize>,

    /// Run every task one at a time.
    #[arg(long)]
    pub single: bool,

    /// text | jsonl
    #[arg(long)]
    pub format: Option<String>,

    /// Suppress event output.
    #[arg(long, short = 'q')]
    pub quiet: bool,

    #[arg(long)]
    pub no_progress: bool,

    /// Fail on any unresolvable `@path` inclusion.
    #[arg(long)]
    pub strict: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct StatusArgs {
    pub file: PathBuf,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ClearArgs {
    pub file: PathBuf,
}
