//! Worktree catalog: shapes `git worktree list --porcelain` output into
//! ordered [`WorktreeRecord`]s.
//!
//! The catalog is rebuilt on every invocation and never mutated afterwards.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

/// One entry of `git worktree list --porcelain`, before any filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawWorktreeEntry {
    pub path: PathBuf,
    pub head: Option<String>,
    /// Full ref as reported by git, e.g. `refs/heads/feature/auth`.
    pub branch: Option<String>,
    pub bare: bool,
}

/// A discoverable worktree under the worktrees root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorktreeRecord {
    /// Path segments relative to the worktrees root, e.g. `["feature", "auth"]`.
    pub segments: Vec<String>,
    pub branch: Option<String>,
    pub head: Option<String>,
    pub path: PathBuf,
}

impl WorktreeRecord {
    /// Relative path joined with `/` (e.g. `feature/auth`).
    pub fn name(&self) -> String {
        self.segments.join("/")
    }

    /// Last path segment, used as the tmux window name.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Branch name for display, or `detached` when HEAD is not on a branch.
    pub fn branch_label(&self) -> &str {
        self.branch.as_deref().unwrap_or("detached")
    }
}

/// Ordered worktree records for one repository snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<WorktreeRecord>,
}

impl Catalog {
    pub fn new(records: Vec<WorktreeRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[WorktreeRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorktreeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_leaf(&self, leaf: &str) -> bool {
        self.records.iter().any(|r| r.leaf() == leaf)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a WorktreeRecord;
    type IntoIter = std::slice::Iter<'a, WorktreeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Parse the output of `git worktree list --porcelain`.
///
/// Entries are separated by blank lines; the final entry may lack a trailing
/// blank line. Unknown attribute lines (`locked`, `prunable`, ...) are ignored.
pub fn parse_porcelain(output: &str) -> Vec<RawWorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<RawWorktreeEntry> = None;

    for line in output.lines() {
        if line.trim().is_empty() {
            entries.extend(current.take());
            continue;
        }

        if let Some(path) = line.strip_prefix("worktree ") {
            entries.extend(current.take());
            current = Some(RawWorktreeEntry {
                path: PathBuf::from(path),
                ..Default::default()
            });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        if let Some(head) = line.strip_prefix("HEAD ") {
            entry.head = Some(head.to_string());
        } else if let Some(branch) = line.strip_prefix("branch ") {
            entry.branch = Some(branch.to_string());
        } else if line == "bare" {
            entry.bare = true;
        }
    }

    entries.extend(current);
    entries
}

/// Shape raw entries into a [`Catalog`], preserving git's order.
///
/// Skips the main worktree at `repo_root`, bare entries, and anything not
/// located under `worktrees_root`. No collision handling happens here.
pub fn build_catalog(
    entries: impl IntoIterator<Item = RawWorktreeEntry>,
    repo_root: &Path,
    worktrees_root: &Path,
) -> Catalog {
    let records = entries
        .into_iter()
        .filter(|e| !e.bare && e.path != repo_root)
        .filter_map(|e| {
            let segments = relative_segments(&e.path, worktrees_root)?;
            Some(WorktreeRecord {
                segments,
                branch: e.branch.map(|b| {
                    b.strip_prefix("refs/heads/")
                        .map(str::to_string)
                        .unwrap_or(b)
                }),
                head: e.head,
                path: e.path,
            })
        })
        .collect();

    Catalog::new(records)
}

/// Path segments of `path` below `root`; `None` when outside or equal to it.
fn relative_segments(path: &Path, root: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}
