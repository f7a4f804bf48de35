use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::Context as _;
use color_eyre::Result;
use tracing::instrument;

#[derive(Clone, Debug, Args)]
pub struct Options {
    /// Skip the confirmation prompt.
    #[arg(short, long)]
    yes: bool,

    #[arg(long, default_value = ".")]
    base_dir: PathBuf,
}

#[instrument]
pub fn exec(options: Options) -> Result<()> {
    let root = options.base_dir.join(".reprovm");
    if !root.exists() {
        println!("nothing to reset at {}", root.display());
        return Ok(());
    }

    if !options.yes {
        let confirmed = inquire::Confirm::new(&format!("Delete {}?", root.display()))
            .with_default(false)
            .prompt()
            .context("prompt for confirmation")?;
        if !confirmed {
            return Ok(());
        }
    }

    std::fs::remove_dir_all(&root).context("remove .reprovm directory")?;
    println!("removed {}", root.display());
    Ok(())
}
