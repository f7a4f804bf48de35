use clap::Subcommand;

pub mod reset;
pub mod show;

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// List the records in the local cache.
    Show(show::Options),
    /// Delete the local CAS and record store.
    Reset(reset::Options),
}
