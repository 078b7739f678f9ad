//! User-facing commands: wire the git and tmux collaborators to the core.
//!
//! Every command starts from a fresh catalog and window set; nothing is
//! carried over between invocations.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::warn;

use crate::catalog::{Catalog, WorktreeRecord};
use crate::config::Config;
use crate::reconcile::{
    apply, apply_cleanup, reconcile, FocusedWindow, SessionLayout, WindowSet, MAIN_WINDOW,
};
use crate::resolve::{detect_leaf_collisions, ensure_unique_leaf, resolve};
use crate::tmux::{session_name_for, Multiplexer};

/// Marker for a worktree with an open window.
pub const OPEN_MARKER: &str = "●";
/// Marker for a worktree without a window.
pub const CLOSED_MARKER: &str = "○";

/// Where the current repository lives and how its session is laid out.
#[derive(Debug, Clone)]
pub struct RepoContext {
    pub repo_root: PathBuf,
    pub worktrees_root: PathBuf,
    pub layout: SessionLayout,
}

impl RepoContext {
    pub fn new(repo_root: PathBuf, config: &Config) -> Self {
        let dir_name = repo_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        let layout = SessionLayout::new(session_name_for(&dir_name), repo_root.clone())
            .with_reserved(config.reserved_windows.iter().cloned());
        Self {
            worktrees_root: config.worktrees_root(&repo_root),
            repo_root,
            layout,
        }
    }

    /// Locate the main repository containing `cwd`.
    pub fn discover(cwd: &Path, config: &Config) -> Result<Self> {
        let repo_root = crate::git::repo_root(cwd)?;
        Ok(Self::new(repo_root, config))
    }

    pub fn session(&self) -> &str {
        &self.layout.session
    }

    pub fn repo_name(&self) -> String {
        self.repo_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.repo_root.display().to_string())
    }

    /// Worktrees root relative to the repo, for messages (e.g. `.worktrees/`).
    pub fn worktrees_label(&self) -> String {
        let relative = self
            .worktrees_root
            .strip_prefix(&self.repo_root)
            .unwrap_or(self.worktrees_root.as_path());
        format!("{}/", relative.display())
    }

    /// Fetch a fresh catalog from git.
    pub fn catalog(&self) -> Result<Catalog> {
        crate::git::list_worktrees(&self.repo_root, &self.worktrees_root)
    }
}

/// Close windows whose worktrees are gone. No-op if the session doesn't exist.
pub fn sync_orphans(
    ctx: &RepoContext,
    catalog: &Catalog,
    windows: &WindowSet,
    mux: &dyn Multiplexer,
) -> Result<Vec<String>> {
    if !windows.session_exists() {
        return Ok(Vec::new());
    }
    let plan = reconcile(&ctx.layout, catalog, windows, None);
    Ok(apply_cleanup(&plan, mux)?)
}

/// Read the session's windows, treating an unreachable tmux as "no session".
fn read_windows_lenient(ctx: &RepoContext, mux: &dyn Multiplexer) -> WindowSet {
    WindowSet::read(mux, ctx.session()).unwrap_or_else(|e| {
        warn!("Could not query {} windows: {e:#}", mux.name());
        WindowSet::absent()
    })
}

fn report_closed(err: &mut dyn Write, closed: &[String]) -> Result<()> {
    for window in closed {
        writeln!(err, "  Cleaned up orphaned window: {window}")?;
    }
    Ok(())
}

/// Warn about leaves shared by several worktrees; `cd` refuses those.
fn report_collisions(err: &mut dyn Write, catalog: &Catalog) -> Result<()> {
    for (leaf, paths) in detect_leaf_collisions(catalog) {
        writeln!(err, "Leaf name '{leaf}' is shared by: {}", paths.join(", "))?;
    }
    Ok(())
}

/// One row of `ls` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub name: String,
    pub leaf: String,
    pub branch: Option<String>,
    pub path: PathBuf,
    pub window_open: bool,
}

/// Cross-reference the catalog with the open windows.
pub fn list_entries(catalog: &Catalog, windows: &WindowSet) -> Vec<ListEntry> {
    catalog
        .iter()
        .map(|r| ListEntry {
            name: r.name(),
            leaf: r.leaf().to_string(),
            branch: r.branch.clone(),
            path: r.path.clone(),
            window_open: windows.contains(r.leaf()),
        })
        .collect()
}

/// `ls`: list worktrees and whether each has an open window.
pub fn cmd_ls(
    ctx: &RepoContext,
    catalog: &Catalog,
    mux: &dyn Multiplexer,
    json: bool,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let windows = read_windows_lenient(ctx, mux);
    let closed = sync_orphans(ctx, catalog, &windows, mux)?;
    report_closed(err, &closed)?;
    report_collisions(err, catalog)?;

    let entries = list_entries(catalog, &windows);

    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }

    if entries.is_empty() {
        writeln!(out, "No worktrees found under {}", ctx.worktrees_label())?;
        writeln!(
            out,
            "Create one with: git worktree add {}<name> -b <branch>",
            ctx.worktrees_label()
        )?;
        return Ok(());
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0).max(30);
    writeln!(out, "Worktrees in {}:\n", ctx.repo_name())?;
    for entry in &entries {
        let marker = if entry.window_open {
            OPEN_MARKER
        } else {
            CLOSED_MARKER
        };
        writeln!(
            out,
            "  {marker} {:<width$} {}",
            entry.name,
            entry.path.display()
        )?;
    }

    let open_count = entries.iter().filter(|e| e.window_open).count();
    writeln!(out)?;
    writeln!(
        out,
        "{OPEN_MARKER} = tmux window open    {CLOSED_MARKER} = no tmux window"
    )?;
    writeln!(
        out,
        "Session: {} ({} worktrees, {open_count} open)",
        ctx.session(),
        entries.len()
    )?;
    Ok(())
}

/// Resolve `query` to a worktree whose leaf can safely name a window.
pub fn select_target<'a>(
    ctx: &RepoContext,
    catalog: &'a Catalog,
    query: &str,
) -> Result<&'a WorktreeRecord> {
    if catalog.is_empty() {
        bail!("No worktrees found under {}", ctx.worktrees_label());
    }

    let record = resolve(catalog, query).into_result()?;
    ensure_unique_leaf(catalog, record)?;

    if ctx.layout.is_reserved(record.leaf()) {
        bail!(
            "Worktree '{}' uses the reserved window name '{}'.\nRename the worktree directory to use it with worktree-mux.",
            record.name(),
            record.leaf()
        );
    }
    Ok(record)
}

/// `cd [query]`: switch to a worktree's window, creating it if needed.
///
/// Without a query, switches to the `main` window at the repository root.
pub fn cmd_cd(
    ctx: &RepoContext,
    catalog: &Catalog,
    query: Option<&str>,
    mux: &dyn Multiplexer,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<FocusedWindow> {
    if !mux.is_attached() {
        bail!(
            "Not inside a {} session.\nworktree-mux manages tmux windows; run this from within tmux.",
            mux.name()
        );
    }
    mux.check_available()?;

    let windows = WindowSet::read(mux, ctx.session())
        .with_context(|| format!("failed to read windows of session '{}'", ctx.session()))?;

    let target = match query.map(|q| select_target(ctx, catalog, q)).transpose() {
        Ok(target) => target,
        Err(e) => {
            // Orphans are cleaned up even when the query can't be resolved.
            match sync_orphans(ctx, catalog, &windows, mux) {
                Ok(closed) => report_closed(err, &closed)?,
                Err(cleanup) => warn!("Orphan cleanup failed: {cleanup:#}"),
            }
            return Err(e);
        }
    };

    let plan = reconcile(&ctx.layout, catalog, &windows, target);
    let focused = apply(&plan, mux)?;
    report_closed(err, &focused.closed)?;

    let label = target.map(WorktreeRecord::name);
    writeln!(
        out,
        "→ {} (session: {})",
        label.as_deref().unwrap_or(MAIN_WINDOW),
        focused.session
    )?;
    Ok(focused)
}

/// `dash`: clean up orphans once, then run the live dashboard.
pub fn cmd_dash(ctx: &RepoContext, config: &Config, mux: &dyn Multiplexer) -> Result<()> {
    let catalog = ctx.catalog()?;
    let windows = read_windows_lenient(ctx, mux);
    sync_orphans(ctx, &catalog, &windows, mux)?;

    crate::ui::dashboard::run(ctx, mux, config.refresh_interval())
}
