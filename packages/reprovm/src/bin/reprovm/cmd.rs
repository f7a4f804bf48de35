//! Subcommand implementations for the `reprovm` binary.

pub mod cache;
pub mod graph;
pub mod run;
