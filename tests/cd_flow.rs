//! End-to-end `cd`/`ls` flows against an in-memory multiplexer.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use worktree_mux::catalog::{Catalog, WorktreeRecord};
use worktree_mux::commands::{cmd_cd, cmd_ls, RepoContext};
use worktree_mux::config::Config;
use worktree_mux::error::ResolveError;
use worktree_mux::tmux::{Multiplexer, OpenWindow};

/// Windows are `(id, name, cwd)`; mutations address them by id like tmux.
#[derive(Default)]
struct MemoryMux {
    sessions: RefCell<BTreeMap<String, Vec<(String, String, PathBuf)>>>,
    focused: RefCell<Option<String>>,
    mutations: RefCell<usize>,
    next_id: RefCell<usize>,
}

impl MemoryMux {
    fn windows(&self) -> Vec<String> {
        self.sessions
            .borrow()
            .get("repo")
            .map(|ws| ws.iter().map(|(_, n, _)| n.clone()).collect())
            .unwrap_or_default()
    }

    fn fresh_id(&self) -> String {
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        format!("@{next}")
    }

    fn open(&self, window: &str) {
        let id = self.fresh_id();
        self.sessions
            .borrow_mut()
            .entry("repo".to_string())
            .or_default()
            .push((id, window.to_string(), PathBuf::from("/tmp")));
    }
}

impl Multiplexer for MemoryMux {
    fn name(&self) -> &str {
        "memory"
    }

    fn check_available(&self) -> Result<()> {
        Ok(())
    }

    fn is_attached(&self) -> bool {
        true
    }

    fn session_exists(&self, session: &str) -> Result<bool> {
        Ok(self.sessions.borrow().contains_key(session))
    }

    fn list_windows(&self, session: &str) -> Result<Vec<OpenWindow>> {
        Ok(self
            .sessions
            .borrow()
            .get(session)
            .map(|ws| {
                ws.iter()
                    .map(|(id, name, _)| OpenWindow::new(id.clone(), name.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn create_session(&self, session: &str, window: &str, cwd: &Path) -> Result<String> {
        *self.mutations.borrow_mut() += 1;
        if self.sessions.borrow().contains_key(session) {
            bail!("duplicate session: {session}");
        }
        let id = self.fresh_id();
        self.sessions.borrow_mut().insert(
            session.to_string(),
            vec![(id.clone(), window.to_string(), cwd.to_path_buf())],
        );
        Ok(id)
    }

    fn create_window(&self, session: &str, window: &str, cwd: &Path) -> Result<String> {
        *self.mutations.borrow_mut() += 1;
        let id = self.fresh_id();
        let mut sessions = self.sessions.borrow_mut();
        let Some(windows) = sessions.get_mut(session) else {
            bail!("can't find session: {session}");
        };
        windows.push((id.clone(), window.to_string(), cwd.to_path_buf()));
        Ok(id)
    }

    fn switch_client(&self, session: &str, window_id: &str) -> Result<()> {
        let sessions = self.sessions.borrow();
        let Some((_, name, _)) = sessions
            .get(session)
            .and_then(|ws| ws.iter().find(|(id, _, _)| id == window_id))
        else {
            bail!("can't find window: {window_id}");
        };
        *self.focused.borrow_mut() = Some(name.clone());
        Ok(())
    }

    fn kill_window(&self, session: &str, window_id: &str) -> Result<()> {
        *self.mutations.borrow_mut() += 1;
        if let Some(windows) = self.sessions.borrow_mut().get_mut(session) {
            windows.retain(|(id, _, _)| id != window_id);
        }
        Ok(())
    }
}

fn record(name: &str) -> WorktreeRecord {
    WorktreeRecord {
        segments: name.split('/').map(str::to_string).collect(),
        branch: Some(name.to_string()),
        head: None,
        path: PathBuf::from("/repo/.worktrees").join(name),
    }
}

fn catalog(names: &[&str]) -> Catalog {
    Catalog::new(names.iter().map(|n| record(n)).collect())
}

fn ctx() -> RepoContext {
    RepoContext::new(PathBuf::from("/repo"), &Config::default())
}

fn cd(catalog: &Catalog, query: Option<&str>, mux: &MemoryMux) -> Result<String> {
    let mut out = Vec::new();
    let mut err = Vec::new();
    cmd_cd(&ctx(), catalog, query, mux, &mut out, &mut err)?;
    Ok(String::from_utf8(out)?)
}

fn ls(catalog: &Catalog, mux: &MemoryMux) -> String {
    let mut out = Vec::new();
    let mut err = Vec::new();
    cmd_ls(&ctx(), catalog, mux, false, &mut out, &mut err).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn first_cd_builds_session_then_repeats_are_focus_only() {
    let c = catalog(&["feature/auth", "fix/parser-bug"]);
    let mux = MemoryMux::default();

    assert_eq!(cd(&c, Some("auth"), &mux).unwrap(), "→ feature/auth (session: repo)\n");
    assert_eq!(mux.windows(), vec!["main", "auth"]);
    assert_eq!(mux.focused.borrow().as_deref(), Some("auth"));

    let mutations = *mux.mutations.borrow();
    cd(&c, Some("feature/auth"), &mux).unwrap();
    cd(&c, Some("auth"), &mux).unwrap();
    assert_eq!(*mux.mutations.borrow(), mutations);
    assert_eq!(mux.windows(), vec!["main", "auth"]);
}

#[test]
fn removed_worktree_window_is_cleaned_up_by_ls() {
    let mux = MemoryMux::default();
    cd(&catalog(&["feature/auth", "fix/parser-bug"]), Some("parser-bug"), &mux).unwrap();
    mux.open("dash");

    let after_removal = catalog(&["feature/auth"]);
    let out = ls(&after_removal, &mux);
    assert!(out.contains("Session: repo (1 worktrees, 0 open)"));
    assert_eq!(mux.windows(), vec!["main", "dash"]);
}

#[test]
fn cd_home_restores_main_window() {
    let c = catalog(&["feature/auth"]);
    let mux = MemoryMux::default();
    mux.open("auth");

    assert_eq!(cd(&c, None, &mux).unwrap(), "→ main (session: repo)\n");
    assert_eq!(mux.windows(), vec!["auth", "main"]);
    assert_eq!(mux.focused.borrow().as_deref(), Some("main"));
}

#[test]
fn ambiguous_query_leaves_focus_alone() {
    let c = catalog(&["feature/auth", "refactor-models"]);
    let mux = MemoryMux::default();
    cd(&c, None, &mux).unwrap();
    *mux.focused.borrow_mut() = None;

    let err = cd(&c, Some("re"), &mux).unwrap_err();
    match err.downcast_ref::<ResolveError>() {
        Some(ResolveError::Ambiguous { candidates, .. }) => {
            assert_eq!(candidates, &["feature/auth", "refactor-models"]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    assert!(err.to_string().contains("Be more specific"));
    assert!(mux.focused.borrow().is_none());
}

#[test]
fn dotted_and_numeric_leaves_round_trip() {
    let mux = MemoryMux::default();
    cd(&catalog(&["release-1.2", "7"]), Some("release-1.2"), &mux).unwrap();
    cd(&catalog(&["release-1.2", "7"]), Some("7"), &mux).unwrap();
    assert_eq!(mux.windows(), vec!["main", "release-1.2", "7"]);
    assert_eq!(mux.focused.borrow().as_deref(), Some("7"));

    // Both worktrees removed: their windows go, `main` stays.
    ls(&Catalog::default(), &mux);
    assert_eq!(mux.windows(), vec!["main"]);
}
