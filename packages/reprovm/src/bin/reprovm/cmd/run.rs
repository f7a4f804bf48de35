use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::Context as _;
use color_eyre::Result;
use tracing::instrument;

#[derive(Clone, Debug, Args)]
pub struct Options {
    /// Path to the task manifest.
    pub manifest: PathBuf,

    /// Tasks to build; if empty, builds every task in the manifest.
    pub targets: Vec<String>,

    /// Number of worker threads; defaults to the detected CPU count.
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Root directory under which `.reprovm/cas` and `.reprovm/cache` live.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,
}

#[instrument]
pub fn exec(options: Options) -> Result<bool> {
    let jobs = options.jobs.unwrap_or_else(num_cpus::get);
    let report =
        reprovm::run(&options.manifest, &options.base_dir, &options.targets, jobs).context("run task manifest")?;

    for (name, status) in &report.per_task {
        println!("{status} {name}");
    }

    Ok(!report.failed)
}
