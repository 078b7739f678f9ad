use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::catalog::{build_catalog, parse_porcelain, Catalog};

/// Run `git <args>` in `dir`, returning the raw output.
fn git(dir: &Path, args: &[&str]) -> Result<Output> {
    debug!(dir = %dir.display(), args = %args.join(" "), "git");
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))
}

/// Trimmed stdout of a successful git command, `None` on failure.
fn git_stdout(dir: &Path, args: &[&str]) -> Option<String> {
    let output = git(dir, args).ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Root directory of the main repository for `cwd`.
///
/// Uses `--git-common-dir`, so calling this from inside a linked worktree
/// still returns the main checkout rather than the worktree.
pub fn repo_root(cwd: &Path) -> Result<PathBuf> {
    let output = git(cwd, &["rev-parse", "--git-common-dir"])?;
    if !output.status.success() {
        anyhow::bail!("Not inside a git repository.");
    }

    let common = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
    let common = if common.is_absolute() {
        common
    } else {
        cwd.join(common)
    };
    let common = common
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", common.display()))?;

    common
        .parent()
        .map(Path::to_path_buf)
        .context("git common dir has no parent directory")
}

/// List worktrees of `repo_root` located under `worktrees_root`.
pub fn list_worktrees(repo_root: &Path, worktrees_root: &Path) -> Result<Catalog> {
    let output = git(repo_root, &["worktree", "list", "--porcelain"])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git worktree list failed: {}", stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(build_catalog(
        parse_porcelain(&stdout),
        repo_root,
        worktrees_root,
    ))
}

/// List local branch names for a repo.
pub fn list_branches(repo_path: &Path) -> Result<Vec<String>> {
    let output = git(repo_path, &["branch", "--format=%(refname:short)"])?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git branch failed: {}", stderr.trim());
    }

    let branches = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    Ok(branches)
}

/// Detect the repository's default branch name.
///
/// Tries `git symbolic-ref refs/remotes/origin/HEAD` first (most reliable),
/// then falls back to checking for `main` or `master` among local branches.
pub fn default_branch(repo_path: &Path, local_branches: &[String]) -> Option<String> {
    if let Some(name) = default_branch_from_remote(repo_path) {
        if local_branches.iter().any(|b| b == &name) {
            return Some(name);
        }
    }

    // Fallback: prefer "main", then "master"
    for candidate in ["main", "master"] {
        if local_branches.iter().any(|b| b == candidate) {
            return Some(candidate.to_string());
        }
    }

    None
}

/// Default branch for comparisons, or `main` when nothing better is known.
pub fn comparison_branch(repo_path: &Path) -> String {
    let branches = list_branches(repo_path).unwrap_or_default();
    default_branch(repo_path, &branches).unwrap_or_else(|| "main".to_string())
}

/// Query the remote's default branch via `git symbolic-ref`.
fn default_branch_from_remote(repo_path: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["symbolic-ref", "refs/remotes/origin/HEAD", "--short"])
        .current_dir(repo_path)
        .stderr(Stdio::null())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let full_ref = String::from_utf8_lossy(&output.stdout).trim().to_string();
    full_ref.strip_prefix("origin/").map(|s| s.to_string())
}

/// Commits a worktree's branch has that the default branch lacks, and vice versa.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub ahead: usize,
    pub behind: usize,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ahead, self.behind) {
            (0, 0) => write!(f, "even"),
            (a, 0) => write!(f, "↑{a}"),
            (0, b) => write!(f, "↓{b}"),
            (a, b) => write!(f, "↑{a} ↓{b}"),
        }
    }
}

/// Divergence of `rev` from `default_branch`, measured from their merge base.
///
/// Failures (unknown ref, unrelated histories) degrade to zero counts.
pub fn divergence(repo_root: &Path, rev: &str, default_branch: &str) -> Divergence {
    let range = format!("{default_branch}...{rev}");
    git_stdout(
        repo_root,
        &["rev-list", "--left-right", "--count", &range, "--"],
    )
        .and_then(|out| parse_left_right(&out))
        .unwrap_or_default()
}

/// Parse `rev-list --left-right --count` output: "<behind>\t<ahead>".
fn parse_left_right(output: &str) -> Option<Divergence> {
    let mut parts = output.split_whitespace();
    let behind = parts.next()?.parse().ok()?;
    let ahead = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Divergence { ahead, behind })
}

/// Number of modified or untracked files in a worktree (0 on failure).
pub fn modified_count(worktree: &Path) -> usize {
    git_stdout(worktree, &["status", "--porcelain"])
        .map(|out| out.lines().filter(|l| !l.trim().is_empty()).count())
        .unwrap_or(0)
}

/// Relative time of the last commit (e.g., "2 hours ago"), or "unknown".
pub fn last_commit_relative(worktree: &Path) -> String {
    git_stdout(worktree, &["log", "-1", "--format=%cr"])
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
