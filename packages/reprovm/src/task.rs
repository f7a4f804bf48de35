//! The [`Task`] record and its lifecycle status.

use derive_more::Display;

use crate::hash::Hash;

/// A task's terminal or in-flight state (spec §3).
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum TaskStatus {
    #[display("PENDING")]
    Pending,
    #[display("RUNNING")]
    Running,
    /// Cache hit: outputs were restored from the CAS without running `cmd`.
    #[display("SKIPPED")]
    Skipped,
    #[display("SUCCESS")]
    Success,
    #[display("FAILED")]
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

/// A single task parsed out of a manifest.
///
/// `task_hash` and `result_hash` start unset and are populated during
/// fingerprinting and execution respectively; `dependents` starts empty and
/// is populated once the whole manifest has been parsed (reverse edges).
#[derive(Clone, Debug)]
pub struct Task {
    pub name: String,
    pub cmd: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub deps: Vec<String>,
    pub task_hash: Option<Hash>,
    pub result_hash: Option<Hash>,
    pub status: TaskStatus,
    pub dependents: Vec<String>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            deps: Vec::new(),
            task_hash: None,
            result_hash: None,
            status: TaskStatus::Pending,
            dependents: Vec::new(),
        }
    }
}
