use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::Context as _;
use color_eyre::Result;
use tracing::instrument;

#[derive(Clone, Debug, Args)]
pub struct Options {
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,
}

#[instrument]
pub fn exec(options: Options) -> Result<()> {
    let cache_root = options.base_dir.join(".reprovm").join("cache");
    if !cache_root.exists() {
        println!("{} (no records yet)", cache_root.display());
        return Ok(());
    }
    let entries = std::fs::read_dir(&cache_root).context("read cache directory")?;
    for entry in entries {
        let entry = entry.context("read cache entry")?;
        if entry.path().extension().and_then(|e| e.to_str()) == Some("meta") {
            println!("{}", entry.path().display());
        }
    }
    Ok(())
}
