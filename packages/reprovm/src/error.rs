//! The error taxonomy for the reprovm core.
//!
//! Each variant corresponds to one of the error kinds in the design: a
//! distinct source with a distinct, defined propagation rule. Fatal errors
//! (manifest read, cycle detection) abort the run before scheduling; the rest
//! are attached to a single task and aggregated by the scheduler.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading and closing over a manifest, before
/// any task has been scheduled.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("read manifest {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("unknown target task: {0}")]
    UnknownTarget(String),
}

/// Errors that can occur while computing the dependency closure or ordering.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(
        "cycle detected among {} task(s); scheduled {} before detecting the cycle",
        remaining,
        scheduled
    )]
    Cycle { scheduled: usize, remaining: usize },
}

/// Errors surfaced by the content-addressed store.
#[derive(Debug, Error)]
pub enum CasError {
    #[error("input file missing: {0}")]
    InputMissing(PathBuf),

    #[error("blob {0} not found in CAS")]
    BlobMissing(String),

    #[error("CAS I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced while a single task executes. Every variant here marks the
/// owning task `Failed`; none of them are fatal to the rest of the run.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task {task}: input missing")]
    InputMissing {
        task: String,
        #[source]
        source: CasError,
    },

    #[error("task {task}: command exited with status {code:?}")]
    CommandFailed { task: String, code: Option<i32> },

    #[error("task {task}: declared output {path} was not written")]
    OutputMissing { task: String, path: String },

    #[error("task {task}: failed to launch command")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task {task}: failed to write cache record")]
    RecordWrite {
        task: String,
        #[source]
        source: CasError,
    },
}
