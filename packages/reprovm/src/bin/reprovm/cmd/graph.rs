use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::Context as _;
use color_eyre::Result;
use reprovm::graph;
use reprovm::manifest::Manifest;
use tracing::instrument;

/// Print a manifest's dependency closure and topological order without
/// running anything — the idiomatic analogue of
/// `original_source/task.c`'s `print_task_graph`.
#[derive(Clone, Debug, Args)]
pub struct Options {
    pub manifest: PathBuf,
    pub targets: Vec<String>,
}

#[instrument]
pub fn exec(options: Options) -> Result<()> {
    let manifest = Manifest::load(&options.manifest).context("load manifest")?;
    let subset = graph::closure(&manifest, &options.targets).context("compute target closure")?;
    let order = graph::topo_sort(&manifest, &subset).context("topologically sort closure")?;

    for idx in order {
        let task = &manifest.tasks[idx];
        let deps = if task.deps.is_empty() { "-".to_string() } else { task.deps.join(",") };
        println!("{} <- {}", task.name, deps);
    }

    Ok(())
}
