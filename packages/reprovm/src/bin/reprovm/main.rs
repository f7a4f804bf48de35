//! The binary entrypoint for `reprovm`.

use clap::{crate_version, Parser, Subcommand};
use color_eyre::Result;
use tracing::instrument;
use tracing_subscriber::util::SubscriberInitExt;

// Since this is a binary crate, we need to ensure these modules aren't pub
// so that they can correctly warn about dead code:
// https://github.com/rust-lang/rust/issues/74970
mod cmd;
mod log;

#[derive(Clone, Debug, Parser)]
#[command(name = "reprovm", about = "Reproducible task execution engine", version = crate_version!())]
struct TopLevelFlags {
    #[command(subcommand)]
    command: Command,

    /// When to colorize output
    #[arg(long, value_enum, default_value_t = log::WhenColor::Auto)]
    color: log::WhenColor,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Execute a manifest's tasks
    Run(cmd::run::Options),

    /// Print a manifest's dependency graph without executing anything
    Graph(cmd::graph::Options),

    /// Manage the local cache
    #[clap(subcommand)]
    Cache(cmd::cache::Command),
}

#[instrument]
fn main() -> Result<()> {
    color_eyre::install()?;
    let top = TopLevelFlags::parse();
    log::make_logger(top.color)?.init();

    let ok = match top.command {
        Command::Run(options) => cmd::run::exec(options)?,
        Command::Graph(options) => {
            cmd::graph::exec(options)?;
            true
        }
        Command::Cache(cmd::cache::Command::Show(options)) => {
            cmd::cache::show::exec(options)?;
            true
        }
        Command::Cache(cmd::cache::Command::Reset(options)) => {
            cmd::cache::reset::exec(options)?;
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
