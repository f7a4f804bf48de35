//! The dependency-aware parallel scheduler (spec §4.G), translated from
//! `original_source/parallel_executor.c`'s pthread worker pool into
//! `std::thread` + `std::sync::{Mutex, Condvar}`. Tasks are referred to by
//! stable indices into the owning `Vec<Task>` rather than raw pointers
//! (spec §9).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};

use tracing::{info, instrument, warn};

use crate::cas::Cas;
use crate::executor;
use crate::hash::Hash;
use crate::manifest::Manifest;
use crate::record::RecordStore;
use crate::task::{Task, TaskStatus};

struct State {
    pending_deps: Vec<usize>,
    ready: VecDeque<usize>,
    remaining: usize,
    failed: bool,
    terminal: Vec<bool>,
}

/// Run every task in `subset` (indices into `manifest.tasks`) with `jobs`
/// worker threads, respecting the dependency partial order. Returns the
/// updated tasks (by manifest index) and whether any task failed.
#[instrument(skip(manifest, cas, records), fields(jobs, n = subset.len()))]
pub fn run(manifest: &Manifest, subset: &[usize], jobs: usize, cas: &Cas, records: &RecordStore) -> (Vec<Task>, bool) {
    let jobs = jobs.max(1);
    let n = subset.len();

    // position_of[manifest_idx] -> position within `subset`.
    let position_of: HashMap<usize, usize> = subset.iter().enumerate().map(|(pos, &idx)| (idx, pos)).collect();

    let dependents_in_subset: Vec<Vec<usize>> = subset
        .iter()
        .map(|&idx| {
            manifest.tasks[idx]
                .dependents
                .iter()
                .filter_map(|name| manifest.index_of(name))
                .filter_map(|dep_idx| position_of.get(&dep_idx).copied())
                .collect()
        })
        .collect();

    let mut pending_deps = vec![0usize; n];
    for (pos, &idx) in subset.iter().enumerate() {
        pending_deps[pos] = manifest.tasks[idx]
            .deps
            .iter()
            .filter_map(|name| manifest.index_of(name))
            .filter(|dep_idx| position_of.contains_key(dep_idx))
            .count();
    }

    let mut ready = VecDeque::new();
    for (pos, &count) in pending_deps.iter().enumerate() {
        if count == 0 {
            ready.push_back(pos);
        }
    }

    let state = Arc::new((
        Mutex::new(State {
            pending_deps,
            ready,
            remaining: n,
            failed: false,
            terminal: vec![false; n],
        }),
        Condvar::new(),
    ));
    let tasks = Arc::new(Mutex::new(manifest.tasks.clone()));
    let subset = Arc::new(subset.to_vec());
    let dependents_in_subset = Arc::new(dependents_in_subset);
    let cas = cas.clone();
    let records = Arc::new(records.clone());

    std::thread::scope(|scope| {
        for worker_id in 0..jobs {
            let state = Arc::clone(&state);
            let tasks = Arc::clone(&tasks);
            let subset = Arc::clone(&subset);
            let dependents_in_subset = Arc::clone(&dependents_in_subset);
            let cas = cas.clone();
            let records = Arc::clone(&records);
            scope.spawn(move || {
                worker_loop(worker_id, &state, &tasks, subset.as_slice(), dependents_in_subset.as_slice(), &cas, &records)
            });
        }
    });

    let (state_mu, _) = &*state;
    let failed = state_mu.lock().unwrap().failed;
    let tasks = Arc::try_unwrap(tasks).expect("all workers joined").into_inner().unwrap();
    (tasks, failed)
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    worker_id: usize,
    state: &(Mutex<State>, Condvar),
    tasks: &Mutex<Vec<Task>>,
    subset: &[usize],
    dependents_in_subset: &[Vec<usize>],
    cas: &Cas,
    records: &RecordStore,
) {
    let (state_mu, condvar) = state;
    loop {
        let pos = {
            let mut guard = state_mu.lock().unwrap();
            let pos = loop {
                if let Some(pos) = guard.ready.pop_front() {
                    if guard.terminal[pos] {
                        // Resolved by a failure cascade while still queued.
                        continue;
                    }
                    break Some(pos);
                }
                if guard.remaining == 0 {
                    break None;
                }
                guard = condvar.wait(guard).unwrap();
            };
            match pos {
                Some(pos) => pos,
                None => return,
            }
        };

        let idx = subset[pos];
        let mut task = tasks.lock().unwrap()[idx].clone();
        task.status = TaskStatus::Running;
        info!(worker_id, task = %task.name, "dispatched");

        let dep_result = |name: &str| -> Option<Hash> {
            let guard = tasks.lock().unwrap();
            guard.iter().find(|t| t.name == name).and_then(|t| t.result_hash.clone())
        };
        let outcome = executor::execute(&mut task, cas, records, dep_result);
        if let Err(err) = &outcome {
            warn!(task = %task.name, %err, "task execution failed");
        }

        tasks.lock().unwrap()[idx] = task.clone();

        let mut guard = state_mu.lock().unwrap();
        guard.terminal[pos] = true;
        guard.remaining -= 1;

        if task.status == TaskStatus::Failed {
            guard.failed = true;
            cascade_fail(&mut guard, tasks, subset, dependents_in_subset, pos);
        } else {
            for &dp in &dependents_in_subset[pos] {
                if guard.terminal[dp] {
                    continue;
                }
                guard.pending_deps[dp] -= 1;
                if guard.pending_deps[dp] == 0 {
                    guard.ready.push_back(dp);
                }
            }
        }
        condvar.notify_all();
    }
}

/// Mark every subset position reachable from `pos` through dependent edges
/// as terminally Failed, without ever dispatching them (spec's expanded
/// transitive-failure policy, §4.G).
fn cascade_fail(guard: &mut State, tasks: &Mutex<Vec<Task>>, subset: &[usize], dependents_in_subset: &[Vec<usize>], pos: usize) {
    let mut queue: VecDeque<usize> = dependents_in_subset[pos].iter().copied().collect();
    while let Some(dp) = queue.pop_front() {
        if guard.terminal[dp] {
            continue;
        }
        guard.terminal[dp] = true;
        guard.remaining -= 1;
        tasks.lock().unwrap()[subset[dp]].status = TaskStatus::Failed;
        queue.extend(dependents_in_subset[dp].iter().copied());
    }
}
