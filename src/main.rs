use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    match &args.command {
        Command::Scan(scan) => workflow::run_scan(scan),
        Command::Plan(plan) => workflow::run_plan(plan),
        Command::Split(split) => workflow::run_split(split),
        Command::Group(group) => workflow::run_group(group),
        Command::Rename(rename) => workflow::run_rename(rename),
    }
}

/// Logs go to stderr so `--json` output stays machine-readable.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
