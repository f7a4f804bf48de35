//! Per-task execution: cache-check → run-if-miss → capture-outputs →
//! write-record (spec §4.F). Grounded on `original_source/task.c`'s
//! `execute_task`, with `system(cmd)` replaced by `std::process::Command`
//! run through a shell, matching spec §9 ("shell invocation ... intentionally
//! retained").

use std::path::Path;
use std::process::Command;

use tracing::{info, instrument, warn};

use crate::cas::Cas;
use crate::error::TaskError;
use crate::fingerprint;
use crate::hash::Hash;
use crate::record::{Record, RecordStore};
use crate::task::{Task, TaskStatus};

/// Run (or cache-replay) one task. `dep_result` must answer for every name
/// in `task.deps`, per the fingerprinting precondition (spec §4.E).
#[instrument(skip(task, cas, records, dep_result), fields(task = %task.name))]
pub fn execute(
    task: &mut Task,
    cas: &Cas,
    records: &RecordStore,
    dep_result: impl Fn(&str) -> Option<Hash>,
) -> Result<(), TaskError> {
    let task_hash = fingerprint::task_hash(task, cas, dep_result).map_err(|source| TaskError::InputMissing {
        task: task.name.clone(),
        source,
    })?;
    task.task_hash = Some(task_hash.clone());

    if let Some(record) = records.try_load(&task_hash) {
        restore_outputs(task, cas, &record);
        task.result_hash = Some(record.result_hash);
        task.status = TaskStatus::Skipped;
        info!(task = %task.name, "cache hit, skipped");
        return Ok(());
    }

    task.status = TaskStatus::Running;
    let status = run_command(task)?;
    if !status.success() {
        task.status = TaskStatus::Failed;
        return Err(TaskError::CommandFailed {
            task: task.name.clone(),
            code: status.code(),
        });
    }

    let output_hashes = intern_outputs(task, cas)?;
    if let Some(missing) = output_hashes
        .iter()
        .zip(&task.outputs)
        .find(|(hash, _)| hash.is_none())
        .map(|(_, path)| path.clone())
    {
        // spec §9 Open Question, decided: a declared-but-missing output
        // fails the task rather than being silently recorded as empty.
        task.status = TaskStatus::Failed;
        warn!(task = %task.name, path = %missing, "declared output missing after successful command");
        return Err(TaskError::OutputMissing {
            task: task.name.clone(),
            path: missing,
        });
    }

    let result_hash = fingerprint::result_hash(&output_hashes);
    task.result_hash = Some(result_hash.clone());

    let outputs = task
        .outputs
        .iter()
        .cloned()
        .zip(output_hashes.into_iter().flatten())
        .collect();
    let record = Record {
        task_hash,
        result_hash,
        outputs,
    };
    records.write(&record, cas).map_err(|source| TaskError::RecordWrite {
        task: task.name.clone(),
        source,
    })?;

    task.status = TaskStatus::Success;
    Ok(())
}

fn restore_outputs(task: &Task, cas: &Cas, record: &Record) {
    for (path, hash) in &record.outputs {
        if task.outputs.iter().any(|o| o == path) {
            if let Err(err) = cas.fetch_to_file(hash, Path::new(path)) {
                warn!(task = %task.name, %path, %err, "failed to restore cached output");
            }
        }
    }
}

fn run_command(task: &Task) -> Result<std::process::ExitStatus, TaskError> {
    if task.cmd.trim().is_empty() {
        // A no-op task always "succeeds" without spawning anything.
        return Ok(no_op_success());
    }
    let mut command = Command::new("sh");
    command.arg("-c").arg(&task.cmd);
    command.status().map_err(|source| TaskError::Spawn {
        task: task.name.clone(),
        source,
    })
}

#[cfg(unix)]
fn no_op_success() -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(0)
}

#[cfg(not(unix))]
fn no_op_success() -> std::process::ExitStatus {
    Command::new("cmd").arg("/C").arg("exit 0").status().expect("trivial no-op command")
}

fn intern_outputs(task: &Task, cas: &Cas) -> Result<Vec<Option<Hash>>, TaskError> {
    let mut hashes = Vec::with_capacity(task.outputs.len());
    for output in &task.outputs {
        let path = Path::new(output);
        if !path.exists() {
            hashes.push(None);
            continue;
        }
        let hash = cas.store_from_file(path).map_err(|source| TaskError::InputMissing {
            task: task.name.clone(),
            source,
        })?;
        hashes.push(Some(hash));
    }
    Ok(hashes)
}
