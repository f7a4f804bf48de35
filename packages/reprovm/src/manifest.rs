//! The manifest grammar: `task <name> { cmd = ...; inputs = ...; outputs =
//! ...; deps = ... }`. Grounded on `original_source/task.c`'s
//! `parse_manifest`, rewritten as a line-oriented state machine instead of
//! `strtok_r`-over-a-mutable-buffer.

use std::collections::HashMap;
use std::path::Path;

use tracing::{instrument, warn};

use crate::error::ManifestError;
use crate::task::Task;

/// A parsed manifest: the task list plus the computed reverse edges
/// (`dependents`).
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    pub tasks: Vec<Task>,
}

impl Manifest {
    pub fn find(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.name == name)
    }

    /// Read and parse a manifest file, then compute reverse edges. Unknown
    /// dependency names warn but do not abort (spec §4.C): such a task is
    /// simply unschedulable if it ends up in a requested closure, which
    /// `graph::closure` reports.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::parse(&text, path)?;
        manifest.link_dependents();
        Ok(manifest)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, ManifestError> {
        let mut tasks = Vec::new();
        let mut current: Option<Task> = None;

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix("task ") {
                let rest = rest.trim_start();
                let name = rest
                    .split(|c: char| c.is_whitespace() || c == '{')
                    .next()
                    .unwrap_or("")
                    .to_string();
                if name.is_empty() {
                    return Err(ManifestError::Malformed {
                        path: path.to_path_buf(),
                        reason: format!("`task` declaration without a name: {raw_line:?}"),
                    });
                }
                current = Some(Task::new(name));

                // Anything after the opening `{` on this same line (e.g.
                // `task build { cmd = cp src.txt out.txt`) is a field, not
                // just punctuation to discard.
                if let Some(after_brace) = rest.split_once('{').map(|(_, after)| after.trim()) {
                    if !after_brace.is_empty() {
                        if let Some((key, value)) = split_field(after_brace) {
                            apply_field(current.as_mut().expect("just set"), key, value);
                        }
                        if after_brace.contains('}') {
                            tasks.push(current.take().expect("current task set above"));
                        }
                    }
                }
                continue;
            }

            let Some(task) = current.as_mut() else {
                // A line outside any task block that isn't blank/comment/`task`
                // is tolerated as forward-compat noise, matching the source's
                // silent `cur` guard on every field branch.
                continue;
            };

            if let Some((key, value)) = split_field(line) {
                apply_field(task, key, value);
            }

            if line.contains('}') {
                tasks.push(current.take().expect("current task set above"));
            }
        }

        if let Some(task) = current.take() {
            tasks.push(task);
        }

        Ok(Self { tasks })
    }

    fn link_dependents(&mut self) {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (i, t) in self.tasks.iter().enumerate() {
            by_name.insert(t.name.clone(), i);
        }
        let deps_by_task: Vec<Vec<String>> = self.tasks.iter().map(|t| t.deps.clone()).collect();
        for (i, deps) in deps_by_task.iter().enumerate() {
            let dependent_name = self.tasks[i].name.clone();
            for dep in deps {
                match by_name.get(dep) {
                    Some(&dep_idx) => self.tasks[dep_idx].dependents.push(dependent_name.clone()),
                    None => warn!(task = %dependent_name, dep, "unknown dependency name"),
                }
            }
        }
    }
}

fn apply_field(task: &mut Task, key: &str, value: &str) {
    match key {
        "cmd" => task.cmd = value.to_string(),
        "inputs" => task.inputs = split_csv(value),
        "outputs" => task.outputs = split_csv(value),
        "deps" => task.deps = split_csv(value),
        _ => {} // unknown keys ignored, spec §4.C
    }
}

/// Split `key = value` on the first `=`, trimming both sides. Returns
/// `None` if there's no `=` on the line (an unrecognized line inside a task
/// block — ignored per spec §4.C).
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let value = value.trim_end_matches('}').trim();
    Some((key.trim(), value))
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
# comment
task build {
  cmd = cp src.txt out.txt
  inputs = src.txt
  outputs = out.txt
  deps =
}
task test {
  cmd = cp out.txt result.txt
  inputs = out.txt
  outputs = result.txt
  deps = build
}
";

    #[test]
    fn parses_two_task_manifest() {
        let manifest = Manifest::parse(MANIFEST, Path::new("<test>")).unwrap();
        assert_eq!(manifest.tasks.len(), 2);
        assert_eq!(manifest.tasks[0].name, "build");
        assert_eq!(manifest.tasks[0].cmd, "cp src.txt out.txt");
        assert_eq!(manifest.tasks[1].deps, vec!["build".to_string()]);
    }

    #[test]
    fn links_reverse_edges() {
        let mut manifest = Manifest::parse(MANIFEST, Path::new("<test>")).unwrap();
        manifest.link_dependents();
        assert_eq!(manifest.find("build").unwrap().dependents, vec!["test".to_string()]);
        assert!(manifest.find("test").unwrap().dependents.is_empty());
    }

    #[test]
    fn task_without_name_is_malformed() {
        let err = Manifest::parse("task {\n  cmd = x\n}\n", Path::new("<test>"));
        assert!(matches!(err, Err(ManifestError::Malformed { .. })));
    }

    /// S1's manifest puts `cmd` on the same line as the opening brace; a
    /// parser that drops the rest of that line after extracting the task
    /// name would leave `cmd` empty.
    const S1_MANIFEST: &str = "\
task build { cmd = cp src.txt out.txt
  inputs = src.txt
  outputs = out.txt
  deps = }
task test { cmd = cp out.txt result.txt
  inputs = out.txt
  outputs = result.txt
  deps = build }
";

    #[test]
    fn cmd_on_the_same_line_as_the_opening_brace_is_captured() {
        let manifest = Manifest::parse(S1_MANIFEST, Path::new("<test>")).unwrap();
        assert_eq!(manifest.tasks.len(), 2);
        assert_eq!(manifest.tasks[0].name, "build");
        assert_eq!(manifest.tasks[0].cmd, "cp src.txt out.txt");
        assert_eq!(manifest.tasks[0].inputs, vec!["src.txt".to_string()]);
        assert_eq!(manifest.tasks[0].outputs, vec!["out.txt".to_string()]);
        assert!(manifest.tasks[0].deps.is_empty());
        assert_eq!(manifest.tasks[1].name, "test");
        assert_eq!(manifest.tasks[1].cmd, "cp out.txt result.txt");
        assert_eq!(manifest.tasks[1].deps, vec!["build".to_string()]);
    }

    #[test]
    fn unclosed_final_block_is_still_pushed() {
        let manifest = Manifest::parse("task build { cmd = cp src.txt out.txt\n  inputs = src.txt\n", Path::new("<test>")).unwrap();
        assert_eq!(manifest.tasks.len(), 1);
        assert_eq!(manifest.tasks[0].cmd, "cp src.txt out.txt");
    }

    use simple_test_case::test_case;

    #[test_case("x.txt,y.txt", vec!["x.txt", "y.txt"]; "plain csv")]
    #[test_case(" x.txt , , y.txt ", vec!["x.txt", "y.txt"]; "whitespace and empty tokens")]
    #[test_case("", vec![]; "empty field")]
    #[test_case(",,", vec![]; "only separators")]
    fn csv_fields_trim_and_drop_empty_tokens(value: &str, expected: Vec<&str>) {
        let text = format!("task a {{\n  inputs = {value}\n  outputs =\n  deps =\n}}\n");
        let manifest = Manifest::parse(&text, Path::new("<test>")).unwrap();
        let expected: Vec<String> = expected.into_iter().map(str::to_string).collect();
        assert_eq!(manifest.tasks[0].inputs, expected);
    }
}
