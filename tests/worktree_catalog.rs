//! Catalog discovery against a real git repository.
//!
//! Skipped when `git` is not installed.

use std::path::{Path, PathBuf};
use std::process::Command;

use worktree_mux::commands::RepoContext;
use worktree_mux::config::Config;
use worktree_mux::git;
use worktree_mux::resolve::{resolve, Resolution};

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Repo with `main`, three worktrees under `.worktrees/` and one outside it.
fn fixture() -> (tempfile::TempDir, PathBuf) {
    let temp = tempfile::TempDir::new().unwrap();
    let base = temp.path().canonicalize().unwrap();
    let repo = base.join("my.repo");
    std::fs::create_dir(&repo).unwrap();

    run_git(&repo, &["init", "-q"]);
    run_git(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    run_git(&repo, &["commit", "-q", "--allow-empty", "-m", "init"]);

    run_git(
        &repo,
        &["worktree", "add", "-q", ".worktrees/feature/auth", "-b", "feature/auth"],
    );
    run_git(
        &repo,
        &["worktree", "add", "-q", ".worktrees/fix/parser-bug", "-b", "fix/parser-bug"],
    );
    run_git(
        &repo,
        &["worktree", "add", "-q", "--detach", ".worktrees/spike"],
    );
    let outside = base.join("elsewhere");
    run_git(
        &repo,
        &["worktree", "add", "-q", outside.to_str().unwrap(), "-b", "elsewhere"],
    );

    (temp, repo)
}

#[test]
fn catalogs_only_worktrees_under_root() {
    if !git_available() {
        return;
    }
    let (_temp, repo) = fixture();
    let ctx = RepoContext::new(repo.clone(), &Config::default());
    let catalog = ctx.catalog().unwrap();

    let mut names: Vec<String> = catalog.iter().map(|r| r.name()).collect();
    names.sort();
    assert_eq!(names, vec!["feature/auth", "fix/parser-bug", "spike"]);

    let auth = catalog.iter().find(|r| r.leaf() == "auth").unwrap();
    assert_eq!(auth.branch.as_deref(), Some("feature/auth"));
    assert_eq!(auth.path, repo.join(".worktrees/feature/auth"));

    let spike = catalog.iter().find(|r| r.leaf() == "spike").unwrap();
    assert_eq!(spike.branch, None);
    assert_eq!(spike.branch_label(), "detached");
    assert!(spike.head.is_some());
}

#[test]
fn repo_root_from_inside_a_worktree_is_the_main_checkout() {
    if !git_available() {
        return;
    }
    let (_temp, repo) = fixture();
    let inside = repo.join(".worktrees/fix/parser-bug");
    assert_eq!(git::repo_root(&inside).unwrap(), repo);

    let ctx = RepoContext::discover(&inside, &Config::default()).unwrap();
    assert_eq!(ctx.session(), "my_repo");
}

#[test]
fn resolves_against_discovered_catalog() {
    if !git_available() {
        return;
    }
    let (_temp, repo) = fixture();
    let ctx = RepoContext::new(repo, &Config::default());
    let catalog = ctx.catalog().unwrap();

    match resolve(&catalog, "parser") {
        Resolution::Resolved { record, .. } => assert_eq!(record.name(), "fix/parser-bug"),
        other => panic!("expected a unique match, got {other:?}"),
    }
}

#[test]
fn worktree_stats() {
    if !git_available() {
        return;
    }
    let (_temp, repo) = fixture();
    let auth = repo.join(".worktrees/feature/auth");

    assert_eq!(git::modified_count(&auth), 0);
    std::fs::write(auth.join("new.txt"), "x").unwrap();
    assert_eq!(git::modified_count(&auth), 1);

    run_git(&auth, &["commit", "-q", "--allow-empty", "-m", "work"]);
    let div = git::divergence(&repo, "feature/auth", "main");
    assert_eq!((div.ahead, div.behind), (1, 0));
    assert_eq!(div.to_string(), "↑1");

    assert_eq!(git::comparison_branch(&repo), "main");
    assert_ne!(git::last_commit_relative(&auth), "unknown");
}

#[test]
fn divergence_ignores_files_named_like_the_range() {
    if !git_available() {
        return;
    }
    let (_temp, repo) = fixture();
    let elsewhere = repo.parent().unwrap().join("elsewhere");
    run_git(&elsewhere, &["commit", "-q", "--allow-empty", "-m", "work"]);
    run_git(&repo, &["commit", "-q", "--allow-empty", "-m", "ahead"]);

    // Without `--`, git rejects a range that also names a working-tree file.
    std::fs::write(repo.join("main...elsewhere"), "x").unwrap();
    let div = git::divergence(&repo, "elsewhere", "main");
    assert_eq!((div.ahead, div.behind), (1, 1));
}
