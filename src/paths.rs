//! Centralized path resolution for application files.
//!
//! - Config file (`~/.config/worktree-mux[-dev]/config.toml`)
//! - Log directory (`~/.local/share/worktree-mux[-dev]/`)
//!
//! Dev builds (`0.0.0-dev`) use `worktree-mux-dev` subdirectories to avoid
//! interfering with an installed release binary.
//!
//! Tests can redirect every path under a temporary directory with
//! [`TestPathGuard`]:
//! ```ignore
//! let temp_dir = tempfile::TempDir::new().unwrap();
//! let _guard = TestPathGuard::new(temp_dir.path());
//! assert_eq!(config_file().unwrap(), temp_dir.path().join("config.toml"));
//! ```

use std::cell::RefCell;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Returns "worktree-mux-dev" for dev builds, "worktree-mux" for release builds.
fn app_dir_name() -> &'static str {
    if cfg!(dev_build) {
        "worktree-mux-dev"
    } else {
        "worktree-mux"
    }
}

/// Categories of application paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Config file: `~/.config/worktree-mux/config.toml`
    Config,
    /// Log directory: `~/.local/share/worktree-mux/`
    LogDir,
}

/// Path resolution strategy (thread-local).
#[derive(Debug, PartialEq)]
enum PathStrategy {
    /// Production: Use XDG Base Directory Specification.
    Xdg,
    /// Testing: Use custom base directory for all paths.
    Override(PathBuf),
}

thread_local! {
    static PATH_STRATEGY: RefCell<PathStrategy> = const { RefCell::new(PathStrategy::Xdg) };
}

/// Resolve a path based on the current strategy.
///
/// Returns `None` when the path cannot be resolved (e.g., HOME not set in XDG mode).
pub fn resolve(kind: PathKind) -> Option<PathBuf> {
    PATH_STRATEGY.with(|strategy| match *strategy.borrow() {
        PathStrategy::Xdg => resolve_xdg(
            kind,
            std::env::var_os("XDG_CONFIG_HOME"),
            std::env::var_os("XDG_DATA_HOME"),
            std::env::var_os("HOME"),
        ),
        PathStrategy::Override(ref base) => Some(resolve_override(base, kind)),
    })
}

/// Resolve a path using XDG Base Directory Specification.
fn resolve_xdg(
    kind: PathKind,
    xdg_config: Option<OsString>,
    xdg_data: Option<OsString>,
    home: Option<OsString>,
) -> Option<PathBuf> {
    let home = home.map(PathBuf::from);
    match kind {
        PathKind::Config => {
            // Prefer $XDG_CONFIG_HOME, fall back to $HOME/.config
            let base = xdg_config
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or_else(|| home.map(|h| h.join(".config")))?;
            Some(base.join(app_dir_name()).join("config.toml"))
        }
        PathKind::LogDir => {
            // Prefer $XDG_DATA_HOME, fall back to $HOME/.local/share
            let base = xdg_data
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or_else(|| home.map(|h| h.join(".local").join("share")))?;
            Some(base.join(app_dir_name()))
        }
    }
}

/// Resolve a path using a custom base directory (for testing).
fn resolve_override(base: &Path, kind: PathKind) -> PathBuf {
    match kind {
        PathKind::Config => base.join("config.toml"),
        PathKind::LogDir => base.to_path_buf(),
    }
}

/// Resolve the config file path.
pub fn config_file() -> Option<PathBuf> {
    resolve(PathKind::Config)
}

/// Resolve the log directory path.
pub fn log_directory() -> Option<PathBuf> {
    resolve(PathKind::LogDir)
}

/// Override path resolution for the current thread.
pub fn set_test_dir(base: impl Into<PathBuf>) {
    PATH_STRATEGY.with(|strategy| {
        *strategy.borrow_mut() = PathStrategy::Override(base.into());
    });
}

/// Reset path resolution back to XDG Base Directory Specification.
pub fn reset_to_xdg() {
    PATH_STRATEGY.with(|strategy| {
        *strategy.borrow_mut() = PathStrategy::Xdg;
    });
}

/// RAII guard for test path overrides. Resets to XDG behavior when dropped.
pub struct TestPathGuard;

impl TestPathGuard {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        set_test_dir(base_dir);
        TestPathGuard
    }
}

impl Drop for TestPathGuard {
    fn drop(&mut self) {
        reset_to_xdg();
    }
}
