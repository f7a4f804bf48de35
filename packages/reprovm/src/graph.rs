//! Dependency closure and topological ordering over a [`Manifest`](crate::manifest::Manifest).
//!
//! Grounded on `original_source/task.c`'s `collect_needed_tasks`/`collect_dfs`
//! and `topo_sort`, translated from raw-pointer task graphs (spec §9: "a
//! cyclic graph of raw pointers") into plain `usize` indices into
//! `manifest.tasks` — the DAG itself needs no graph library, just an
//! adjacency view computed from `deps`/`dependents`.

use std::collections::HashSet;

use tracing::instrument;

use crate::error::{GraphError, ManifestError};
use crate::manifest::Manifest;

/// The transitive closure of `targets` (empty ⇒ every task), as manifest
/// indices in DFS-visit order (spec §4.D: order is not itself significant).
#[instrument(skip(manifest))]
pub fn closure(manifest: &Manifest, targets: &[String]) -> Result<Vec<usize>, ManifestError> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();

    let roots: Vec<usize> = if targets.is_empty() {
        (0..manifest.tasks.len()).collect()
    } else {
        targets
            .iter()
            .map(|name| {
                manifest
                    .index_of(name)
                    .ok_or_else(|| ManifestError::UnknownTarget(name.clone()))
            })
            .collect::<Result<_, _>>()?
    };

    for root in roots {
        visit(manifest, root, &mut visited, &mut out);
    }
    Ok(out)
}

fn visit(manifest: &Manifest, idx: usize, visited: &mut HashSet<usize>, out: &mut Vec<usize>) {
    if !visited.insert(idx) {
        return;
    }
    for dep_name in &manifest.tasks[idx].deps {
        if let Some(dep_idx) = manifest.index_of(dep_name) {
            visit(manifest, dep_idx, visited, out);
        }
        // Unknown deps were already warned about during parsing; they simply
        // don't extend the closure.
    }
    out.push(idx);
}

/// Kahn's-algorithm topological sort of `subset` (indices into
/// `manifest.tasks`), considering only edges whose endpoints are both in
/// `subset`. Ties are broken by ascending index, which is deterministic
/// given a deterministic manifest parse order (spec §4.D).
#[instrument(skip(manifest, subset))]
pub fn topo_sort(manifest: &Manifest, subset: &[usize]) -> Result<Vec<usize>, GraphError> {
    let in_subset: HashSet<usize> = subset.iter().copied().collect();

    let mut indegree = vec![0usize; manifest.tasks.len()];
    for &idx in subset {
        for dep_name in &manifest.tasks[idx].deps {
            if let Some(dep_idx) = manifest.index_of(dep_name) {
                if in_subset.contains(&dep_idx) {
                    indegree[idx] += 1;
                }
            }
        }
    }

    let mut ready: Vec<usize> = subset
        .iter()
        .copied()
        .filter(|&idx| indegree[idx] == 0)
        .collect();
    ready.sort_unstable();

    let mut result = Vec::with_capacity(subset.len());
    let mut cursor = 0;
    while cursor < ready.len() {
        let idx = ready[cursor];
        cursor += 1;
        result.push(idx);

        let mut newly_ready = Vec::new();
        for dependent_name in &manifest.tasks[idx].dependents {
            let Some(dep_idx) = manifest.index_of(dependent_name) else {
                continue;
            };
            if !in_subset.contains(&dep_idx) {
                continue;
            }
            indegree[dep_idx] -= 1;
            if indegree[dep_idx] == 0 {
                newly_ready.push(dep_idx);
            }
        }
        newly_ready.sort_unstable();
        ready.extend(newly_ready);
    }

    if result.len() != subset.len() {
        return Err(GraphError::Cycle {
            scheduled: result.len(),
            remaining: subset.len() - result.len(),
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    // Manifest doesn't expose a str-based loader publicly; build one via the
    // same parse path as `load` by writing to a tempfile.
    fn manifest(text: &str) -> Manifest {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.tasks");
        std::fs::write(&path, text).unwrap();
        Manifest::load(&path).unwrap()
    }

    const LINEAR: &str = "\
task a { cmd = true\n  deps =\n}\n
task b { cmd = true\n  deps = a\n}\n
task c { cmd = true\n  deps = b\n}\n
";

    const CYCLIC: &str = "\
task a { cmd = true\n  deps = b\n}\n
task b { cmd = true\n  deps = a\n}\n
";

    #[test]
    fn closure_of_all_targets_is_everything() {
        let m = manifest(LINEAR);
        let c = closure(&m, &[]).unwrap();
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn closure_of_single_target_includes_transitive_deps() {
        let m = manifest(LINEAR);
        let c = closure(&m, &["c".to_string()]).unwrap();
        let names: HashSet<&str> = c.iter().map(|&i| m.tasks[i].name.as_str()).collect();
        assert_eq!(names, HashSet::from(["a", "b", "c"]));
    }

    #[test]
    fn closure_of_unknown_target_errors() {
        let m = manifest(LINEAR);
        assert!(closure(&m, &["nope".to_string()]).is_err());
    }

    #[test]
    fn topo_sort_orders_deps_before_dependents() {
        let m = manifest(LINEAR);
        let subset = closure(&m, &[]).unwrap();
        let order = topo_sort(&m, &subset).unwrap();
        let pos = |name: &str| order.iter().position(|&i| m.tasks[i].name == name).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn topo_sort_detects_cycle() {
        let m = manifest(CYCLIC);
        let subset = closure(&m, &[]).unwrap();
        assert!(matches!(topo_sort(&m, &subset), Err(GraphError::Cycle { .. })));
    }
}
