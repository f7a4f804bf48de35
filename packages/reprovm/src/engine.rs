//! The single entry point that wires the manifest parser, graph, scheduler,
//! and executor together (spec §2's component H/I split). Both the CLI and
//! any future library consumer call [`run`].

use std::path::Path;

use thiserror::Error;
use tracing::instrument;

use crate::cas::Cas;
use crate::error::{CasError, GraphError, ManifestError};
use crate::graph;
use crate::manifest::Manifest;
use crate::record::RecordStore;
use crate::scheduler;
use crate::task::TaskStatus;

/// A fatal error, aborting before any task runs (spec §7: ManifestRead and
/// CycleDetected are the only run-aborting kinds).
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Cas(#[from] CasError),
}

/// Outcome of a single `reprovm` invocation.
#[derive(Debug)]
pub struct RunReport {
    pub per_task: Vec<(String, TaskStatus)>,
    pub failed: bool,
}

/// Run `targets` (empty ⇒ all tasks) from the manifest at `manifest_path`,
/// rooted at `base_dir`, with `jobs` worker threads.
#[instrument(skip(targets))]
pub fn run(manifest_path: &Path, base_dir: &Path, targets: &[String], jobs: usize) -> Result<RunReport, RunError> {
    let manifest = Manifest::load(manifest_path)?;
    let subset = graph::closure(&manifest, targets)?;
    // Validates the subset is acyclic before any task runs (spec §4.D); the
    // scheduler re-derives readiness from `deps`/`dependents` itself so it
    // can dispatch independent branches concurrently rather than walking
    // this order serially.
    let order = graph::topo_sort(&manifest, &subset)?;
    tracing::debug!(scheduled = order.len(), "dependency order validated");

    let cas = Cas::init(base_dir)?;
    let records = RecordStore::init(base_dir)?;

    let (tasks, failed) = scheduler::run(&manifest, &subset, jobs, &cas, &records);

    let per_task = subset
        .iter()
        .map(|&idx| (tasks[idx].name.clone(), tasks[idx].status))
        .collect();

    Ok(RunReport { per_task, failed })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn two_task_build_then_cache_replay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("src.txt"), "hello\n").unwrap();

        let manifest_path = dir.path().join("manifest.tasks");
        std::fs::write(
            &manifest_path,
            format!(
                "task build {{ cmd = cp {src}/src.txt {src}/out.txt\n  inputs = {src}/src.txt\n  outputs = {src}/out.txt\n  deps =\n}}\n\
                 task test {{ cmd = cp {src}/out.txt {src}/result.txt\n  inputs = {src}/out.txt\n  outputs = {src}/result.txt\n  deps = build\n}}\n",
                src = dir.path().display(),
            ),
        )
        .unwrap();

        let first = run(&manifest_path, dir.path(), &[], 2).unwrap();
        assert!(!first.failed);
        assert!(first.per_task.iter().all(|(_, s)| *s == TaskStatus::Success));
        assert_eq!(std::fs::read(dir.path().join("result.txt")).unwrap(), b"hello\n");

        let second = run(&manifest_path, dir.path(), &[], 2).unwrap();
        assert!(!second.failed);
        assert!(second.per_task.iter().all(|(_, s)| *s == TaskStatus::Skipped));
    }

    #[test]
    fn cycle_aborts_before_scheduling() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.tasks");
        std::fs::write(&manifest_path, "task a {\n  cmd = true\n  deps = b\n}\ntask b {\n  cmd = true\n  deps = a\n}\n").unwrap();
        let err = run(&manifest_path, dir.path(), &[], 2).unwrap_err();
        assert!(matches!(err, RunError::Graph(GraphError::Cycle { .. })));
    }

    #[test_log::test]
    fn partial_failure_is_reported_with_failed_flag() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.tasks");
        std::fs::write(&manifest_path, "task bad {\n  cmd = false\n  deps =\n}\ntask ok {\n  cmd = true\n  deps =\n}\n").unwrap();
        let report = run(&manifest_path, dir.path(), &[], 2).unwrap();
        assert!(report.failed);
    }
}
