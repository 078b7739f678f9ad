//! Window reconciliation: keep the repo's tmux session in step with its worktrees.
//!
//! [`reconcile`] is pure: it compares a [`Catalog`] snapshot with a [`WindowSet`]
//! snapshot and returns a [`ReconciliationPlan`]. [`apply`] drives the plan
//! against a [`Multiplexer`] in a fixed order:
//!
//! 1. close orphaned windows
//! 2. create the session (with `main`) or the missing `main` window
//! 3. create the target window
//! 4. switch focus
//!
//! Re-running the whole cycle after a partial failure converges to the same
//! end state, because every step is derived from freshly read state.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::catalog::{Catalog, WorktreeRecord};
use crate::error::{MuxOperation, ReconcileError};
use crate::tmux::{Multiplexer, OpenWindow};

/// Reserved window pointing at the repository root.
pub const MAIN_WINDOW: &str = "main";

/// The repository's dedicated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    pub session: String,
    pub repo_root: PathBuf,
    /// Window names besides [`MAIN_WINDOW`] that are never treated as orphans.
    pub reserved: BTreeSet<String>,
}

impl SessionLayout {
    pub fn new(session: impl Into<String>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            session: session.into(),
            repo_root: repo_root.into(),
            reserved: BTreeSet::new(),
        }
    }

    pub fn with_reserved<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_reserved(&self, window: &str) -> bool {
        window == MAIN_WINDOW || self.reserved.contains(window)
    }
}

/// Windows currently open in the session, or the session's absence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowSet {
    session_exists: bool,
    windows: Vec<OpenWindow>,
}

impl WindowSet {
    /// The session does not exist.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn new(windows: Vec<OpenWindow>) -> Self {
        Self {
            session_exists: true,
            windows,
        }
    }

    /// A session holding `names`, with ids `@0`, `@1`, ... in order.
    pub fn open<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            names
                .into_iter()
                .enumerate()
                .map(|(i, name)| OpenWindow::new(format!("@{i}"), name))
                .collect(),
        )
    }

    /// Read the live window set of `session`.
    pub fn read(mux: &dyn Multiplexer, session: &str) -> anyhow::Result<Self> {
        if !mux.session_exists(session)? {
            return Ok(Self::absent());
        }
        Ok(Self::new(mux.list_windows(session)?))
    }

    pub fn session_exists(&self) -> bool {
        self.session_exists
    }

    pub fn contains(&self, name: &str) -> bool {
        self.windows.iter().any(|w| w.name == name)
    }

    /// Id of the first window called `name`.
    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.windows
            .iter()
            .find(|w| w.name == name)
            .map(|w| w.id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OpenWindow> {
        self.windows.iter()
    }
}

/// Where the client ends up after a plan is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
    Main,
    Window(String),
}

impl FocusTarget {
    pub fn window_name(&self) -> &str {
        match self {
            Self::Main => MAIN_WINDOW,
            Self::Window(name) => name,
        }
    }
}

/// A window to create, named after a worktree leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub name: String,
    pub cwd: PathBuf,
}

/// Side effects needed to bring the session in line with the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub session: String,
    pub repo_root: PathBuf,
    pub ensure_session: bool,
    pub ensure_main_window: bool,
    /// Orphaned windows, ordered by name. Every window of an orphaned name is listed.
    pub windows_to_close: BTreeSet<OpenWindow>,
    pub window_to_create: Option<WindowSpec>,
    pub focus: FocusTarget,
    /// Id of the focus window when it is already open.
    pub focus_id: Option<String>,
}

/// The window the client was switched to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusedWindow {
    pub session: String,
    pub window: String,
    pub created: bool,
    /// Orphaned windows closed on the way.
    pub closed: Vec<String>,
}

/// Windows that no longer correspond to any worktree leaf.
pub fn orphaned_windows(
    layout: &SessionLayout,
    catalog: &Catalog,
    windows: &WindowSet,
) -> BTreeSet<OpenWindow> {
    windows
        .iter()
        .filter(|w| !layout.is_reserved(&w.name) && !catalog.contains_leaf(&w.name))
        .cloned()
        .collect()
}

/// Compute the plan for focusing `target` (or `main` when `None`).
///
/// `target` must already be uniquely resolved from `catalog`.
pub fn reconcile(
    layout: &SessionLayout,
    catalog: &Catalog,
    windows: &WindowSet,
    target: Option<&WorktreeRecord>,
) -> ReconciliationPlan {
    let ensure_session = !windows.session_exists();
    let ensure_main_window = windows.session_exists() && !windows.contains(MAIN_WINDOW);

    let mut windows_to_close = orphaned_windows(layout, catalog, windows);

    let (window_to_create, focus) = match target {
        Some(record) => {
            let name = record.leaf().to_string();
            windows_to_close.retain(|w| w.name != name);
            let create = (!windows.contains(&name)).then(|| WindowSpec {
                name: name.clone(),
                cwd: record.path.clone(),
            });
            (create, FocusTarget::Window(name))
        }
        None => (None, FocusTarget::Main),
    };
    let focus_id = windows.id_of(focus.window_name()).map(str::to_string);

    ReconciliationPlan {
        session: layout.session.clone(),
        repo_root: layout.repo_root.clone(),
        ensure_session,
        ensure_main_window,
        windows_to_close,
        window_to_create,
        focus,
        focus_id,
    }
}

/// Apply every step of `plan`, stopping at the first multiplexer failure.
pub fn apply(
    plan: &ReconciliationPlan,
    mux: &dyn Multiplexer,
) -> Result<FocusedWindow, ReconcileError> {
    let closed = apply_cleanup(plan, mux)?;

    let mut main_id = None;
    if plan.ensure_session {
        info!(session = %plan.session, "creating session");
        let id = mux
            .create_session(&plan.session, MAIN_WINDOW, &plan.repo_root)
            .map_err(|e| {
                ReconcileError::new(
                    MuxOperation::CreateSession {
                        session: plan.session.clone(),
                    },
                    &e,
                )
            })?;
        main_id = Some(id);
    } else if plan.ensure_main_window {
        info!(session = %plan.session, "restoring main window");
        main_id = Some(create_window(mux, &plan.session, MAIN_WINDOW, &plan.repo_root)?);
    }

    let mut created_id = None;
    if let Some(spec) = &plan.window_to_create {
        info!(session = %plan.session, window = %spec.name, "creating window");
        created_id = Some(create_window(mux, &plan.session, &spec.name, &spec.cwd)?);
    }

    let window = plan.focus.window_name();
    let fresh_id = match plan.focus {
        FocusTarget::Main => main_id,
        FocusTarget::Window(_) => created_id,
    };
    let switch_err = |reason: anyhow::Error| {
        ReconcileError::new(
            MuxOperation::SwitchClient {
                window: window.to_string(),
            },
            &reason,
        )
    };
    let window_id = fresh_id
        .or_else(|| plan.focus_id.clone())
        .ok_or_else(|| switch_err(anyhow::anyhow!("window '{window}' is not open")))?;

    debug!(session = %plan.session, window, id = %window_id, "switching client");
    mux.switch_client(&plan.session, &window_id)
        .map_err(switch_err)?;

    Ok(FocusedWindow {
        session: plan.session.clone(),
        window: window.to_string(),
        created: plan.window_to_create.is_some(),
        closed,
    })
}

/// Apply only the orphan-closing step of `plan`.
///
/// Used by read-only commands, which must not create sessions or move focus.
/// Returns the names of the windows that were closed.
pub fn apply_cleanup(
    plan: &ReconciliationPlan,
    mux: &dyn Multiplexer,
) -> Result<Vec<String>, ReconcileError> {
    let mut closed = Vec::new();
    for window in &plan.windows_to_close {
        if window.name == MAIN_WINDOW
            || window.name == plan.focus.window_name()
            || plan.focus_id.as_deref() == Some(window.id.as_str())
        {
            continue;
        }
        info!(session = %plan.session, window = %window.name, id = %window.id, "closing orphaned window");
        mux.kill_window(&plan.session, &window.id).map_err(|e| {
            ReconcileError::new(
                MuxOperation::KillWindow {
                    window: window.name.clone(),
                },
                &e,
            )
        })?;
        closed.push(window.name.clone());
    }
    Ok(closed)
}

fn create_window(
    mux: &dyn Multiplexer,
    session: &str,
    window: &str,
    cwd: &Path,
) -> Result<String, ReconcileError> {
    mux.create_window(session, window, cwd).map_err(|e| {
        ReconcileError::new(
            MuxOperation::CreateWindow {
                window: window.to_string(),
            },
            &e,
        )
    })
}
