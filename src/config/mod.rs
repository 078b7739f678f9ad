use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default worktrees root, relative to the repository root.
pub const DEFAULT_WORKTREES_DIR: &str = ".worktrees";

/// Default dashboard refresh period.
pub const DEFAULT_REFRESH_SECS: u64 = 5;

/// User configuration from `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding worktrees, relative to the repository root.
    pub worktrees_dir: PathBuf,
    pub refresh_interval_secs: u64,
    /// Window names (besides `main`) never closed as orphans.
    pub reserved_windows: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worktrees_dir: PathBuf::from(DEFAULT_WORKTREES_DIR),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            reserved_windows: vec!["dash".to_string()],
        }
    }
}

impl Config {
    /// Load from the resolved config path.
    ///
    /// Returns defaults if the file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let Some(path) = crate::paths::config_file() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };

        match toml::from_str::<Config>(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to parse config at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Absolute worktrees root for a repository.
    pub fn worktrees_root(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.worktrees_dir)
    }

    /// Refresh period, never shorter than one second.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}
