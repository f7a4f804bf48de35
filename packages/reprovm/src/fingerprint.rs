//! Task fingerprint (`task_hash`) and result hash computation (spec §4.E).
//!
//! This is the module that corrects the bug spec §9 documents in
//! `original_source/task.c`'s `compute_task_hash`: the source writes an
//! empty placeholder for every upstream `result_hash` instead of consulting
//! the dependency's actual record. Here the caller must supply a
//! `dep_result` accessor, and we simply have no code path that can emit a
//! placeholder in its place.

use itertools::Itertools as _;

use crate::cas::Cas;
use crate::error::CasError;
use crate::hash::Hash;
use crate::task::Task;

/// Compute `task.task_hash`: `cmd=...\ninputs=...\ndeps=...\n` over sorted
/// input blob hashes and deps' result hashes in declared order.
///
/// `dep_result(name)` must return `Some` for every name in `task.deps` that
/// has already completed — the scheduler is responsible for only calling
/// this once all of `task.deps` have terminated (spec §4.E precondition).
/// A dependency that failed and left no result hash contributes an empty
/// string, which is the one placeholder this module allows: it reflects a
/// real absence of output, not a shortcut around doing the lookup.
pub fn task_hash(task: &Task, cas: &Cas, dep_result: impl Fn(&str) -> Option<Hash>) -> Result<Hash, CasError> {
    let mut input_hashes: Vec<Hash> = Vec::with_capacity(task.inputs.len());
    for input in &task.inputs {
        input_hashes.push(cas.store_from_file(std::path::Path::new(input))?);
    }
    input_hashes.sort();
    let inputs_joined = input_hashes.iter().map(Hash::as_str).join(",");

    let deps_joined = task
        .deps
        .iter()
        .map(|dep| dep_result(dep).map(|h| h.as_str().to_string()).unwrap_or_default())
        .join(",");

    let canonical = format!("cmd={}\ninputs={inputs_joined}\ndeps={deps_joined}\n", task.cmd);
    Ok(Hash::of_bytes(canonical))
}

/// Compute a task's `result_hash` from its already-interned output blobs, in
/// sorted order. An output whose hash is unavailable (declared but never
/// produced) contributes an empty string, matching spec §4.E; whether that
/// condition as a whole marks the task Failed is an executor-level policy
/// decision (spec §9 Open Question), not this function's concern.
pub fn result_hash(output_hashes: &[Option<Hash>]) -> Hash {
    let mut rendered: Vec<String> = output_hashes
        .iter()
        .map(|h| h.as_ref().map(|h| h.as_str().to_string()).unwrap_or_default())
        .collect();
    rendered.sort();
    Hash::of_bytes(rendered.iter().join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn task_with(cmd: &str, inputs: &[&str], deps: &[&str]) -> Task {
        let mut t = Task::new("t");
        t.cmd = cmd.to_string();
        t.inputs = inputs.iter().map(|s| s.to_string()).collect();
        t.deps = deps.iter().map(|s| s.to_string()).collect();
        t
    }

    fn write_input(dir: &std::path::Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn input_order_does_not_affect_task_hash() {
        let dir = tempfile::tempdir().unwrap();
        write_input(dir.path(), "a.txt", "aaa");
        write_input(dir.path(), "b.txt", "bbb");
        let cas = Cas::init(dir.path()).unwrap();

        let a = dir.path().join("a.txt").display().to_string();
        let b = dir.path().join("b.txt").display().to_string();
        let t1 = task_with("cmd", &[a.as_str(), b.as_str()], &[]);
        let t2 = task_with("cmd", &[b.as_str(), a.as_str()], &[]);
        let h1 = task_hash(&t1, &cas, |_| None).unwrap();
        let h2 = task_hash(&t2, &cas, |_| None).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn dep_result_hash_feeds_into_task_hash() {
        let dir = tempfile::tempdir().unwrap();
        let cas = Cas::init(dir.path()).unwrap();
        let t = task_with("cmd", &[], &["upstream"]);

        let with_result = task_hash(&t, &cas, |_| Hash::parse("a".repeat(64))).unwrap();
        let without_result = task_hash(&t, &cas, |_| None).unwrap();
        assert_ne!(with_result, without_result);
    }

    #[test]
    fn output_order_does_not_affect_result_hash() {
        let h1 = Hash::of_bytes(b"one");
        let h2 = Hash::of_bytes(b"two");
        let a = result_hash(&[Some(h1.clone()), Some(h2.clone())]);
        let b = result_hash(&[Some(h2), Some(h1)]);
        assert_eq!(a, b);
    }
}
