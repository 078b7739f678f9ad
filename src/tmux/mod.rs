use std::path::Path;
use std::process::{Command, Output, Stdio};

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Minimum tmux version required.
const MIN_TMUX_VERSION: (u32, u32) = (2, 6);

/// A window as reported by the multiplexer.
///
/// Mutations target `id` (tmux `@N`), never `name`: tmux parses a name in a
/// target, so `release-1.2` reads as window `release-1` pane `2` and `0` as an
/// index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OpenWindow {
    pub name: String,
    pub id: String,
}

impl OpenWindow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Operations the window reconciler needs from a terminal multiplexer.
///
/// Every call queries or mutates live multiplexer state; implementations
/// must not cache anything between calls.
pub trait Multiplexer {
    /// Human-readable name (e.g., "tmux").
    fn name(&self) -> &str;

    /// Check that the multiplexer binary is installed and recent enough.
    fn check_available(&self) -> Result<()>;

    /// Whether this process runs inside a multiplexer client that can be switched.
    fn is_attached(&self) -> bool;

    fn session_exists(&self, session: &str) -> Result<bool>;

    /// Windows of `session`, in multiplexer order.
    fn list_windows(&self, session: &str) -> Result<Vec<OpenWindow>>;

    /// Create a detached session whose single initial window is `window` at `cwd`.
    /// Returns the id of that window.
    fn create_session(&self, session: &str, window: &str, cwd: &Path) -> Result<String>;

    /// Returns the id of the new window.
    fn create_window(&self, session: &str, window: &str, cwd: &Path) -> Result<String>;

    /// Switch the attached client to the window `window_id` of `session`.
    fn switch_client(&self, session: &str, window_id: &str) -> Result<()>;

    fn kill_window(&self, session: &str, window_id: &str) -> Result<()>;
}

/// tmux on the user's default server.
#[derive(Debug, Default)]
pub struct LocalTmux;

impl LocalTmux {
    pub fn new() -> Self {
        Self
    }

    /// Run a tmux command and return its trimmed stdout.
    fn tmux_output(&self, args: &[&str]) -> Result<String> {
        let output = Self::run_tmux(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run a tmux command, returning Ok(()) on success.
    fn tmux_run(&self, args: &[&str]) -> Result<()> {
        Self::run_tmux(args)?;
        Ok(())
    }

    /// Execute a tmux command and check for errors.
    fn run_tmux(args: &[&str]) -> Result<Output> {
        debug!(args = %args.join(" "), "tmux");
        let output = Command::new("tmux")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .context("Failed to run tmux command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("tmux {} failed: {}", args.join(" "), stderr.trim());
        }

        Ok(output)
    }
}

impl Multiplexer for LocalTmux {
    fn name(&self) -> &str {
        "tmux"
    }

    fn check_available(&self) -> Result<()> {
        let output = Command::new("tmux")
            .arg("-V")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .context("tmux is not installed or not in PATH")?;

        if !output.status.success() {
            bail!("tmux -V failed");
        }

        let version_str = String::from_utf8_lossy(&output.stdout);
        let (major, minor) = parse_tmux_version(version_str.trim())?;

        if (major, minor) < MIN_TMUX_VERSION {
            bail!(
                "tmux {major}.{minor} is too old; worktree-mux requires >= {}.{}",
                MIN_TMUX_VERSION.0,
                MIN_TMUX_VERSION.1
            );
        }

        debug!("tmux version: {major}.{minor}");
        Ok(())
    }

    fn is_attached(&self) -> bool {
        std::env::var_os("TMUX").is_some_and(|v| !v.is_empty())
    }

    fn session_exists(&self, session: &str) -> Result<bool> {
        let output = Command::new("tmux")
            .args(["has-session", "-t", &session_target(session)])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .context("Failed to run tmux has-session")?;
        Ok(output.success())
    }

    fn list_windows(&self, session: &str) -> Result<Vec<OpenWindow>> {
        let output = self.tmux_output(&[
            "list-windows",
            "-t",
            &session_target(session),
            "-F",
            WINDOW_LIST_FORMAT,
        ])?;
        Ok(parse_window_list(&output))
    }

    fn create_session(&self, session: &str, window: &str, cwd: &Path) -> Result<String> {
        let cwd = cwd.to_string_lossy();
        let id = self.tmux_output(&[
            "new-session",
            "-d",
            "-P",
            "-F",
            "#{window_id}",
            "-s",
            session,
            "-n",
            window,
            "-c",
            &cwd,
        ])?;
        expect_window_id(id)
    }

    fn create_window(&self, session: &str, window: &str, cwd: &Path) -> Result<String> {
        let cwd = cwd.to_string_lossy();
        // `-d` keeps focus where it is; switching is a separate plan step.
        let id = self.tmux_output(&[
            "new-window",
            "-d",
            "-P",
            "-F",
            "#{window_id}",
            "-t",
            &format!("{}:", session_target(session)),
            "-n",
            window,
            "-c",
            &cwd,
        ])?;
        expect_window_id(id)
    }

    fn switch_client(&self, session: &str, window_id: &str) -> Result<()> {
        self.tmux_run(&["switch-client", "-t", &window_target(session, window_id)])
    }

    fn kill_window(&self, session: &str, window_id: &str) -> Result<()> {
        self.tmux_run(&["kill-window", "-t", &window_target(session, window_id)])
    }
}

/// `list-windows` format: id and name separated by a tab.
const WINDOW_LIST_FORMAT: &str = "#{window_id}\t#{window_name}";

/// Exact-match target for a session (`=name`), so `app` never matches `app-2`.
fn session_target(session: &str) -> String {
    format!("={session}")
}

/// Target for a window id (`@N`) inside a session.
fn window_target(session: &str, window_id: &str) -> String {
    format!("={session}:{window_id}")
}

fn expect_window_id(output: String) -> Result<String> {
    if !output.starts_with('@') {
        bail!("tmux did not report a window id (got {output:?})");
    }
    Ok(output)
}

/// Parse `tmux -V` output such as "tmux 3.4", "tmux 3.3a" or "tmux next-3.5".
fn parse_tmux_version(version_str: &str) -> Result<(u32, u32)> {
    let version_part = version_str.strip_prefix("tmux ").unwrap_or(version_str);
    let version_part = version_part.strip_prefix("next-").unwrap_or(version_part);

    let parts: Vec<&str> = version_part.split('.').collect();
    if parts.len() < 2 {
        bail!("Cannot parse tmux version from: {version_str}");
    }

    let major: u32 = parts[0].parse().context(format!(
        "Cannot parse tmux major version from: {version_str}"
    ))?;
    // Minor might have a trailing letter (e.g., "3a"), strip non-digits.
    let minor_str: String = parts[1]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let minor: u32 = minor_str.parse().context(format!(
        "Cannot parse tmux minor version from: {version_str}"
    ))?;

    Ok((major, minor))
}

/// Parse `list-windows` output in [`WINDOW_LIST_FORMAT`].
///
/// Names are kept verbatim after the first tab.
fn parse_window_list(output: &str) -> Vec<OpenWindow> {
    output
        .lines()
        .filter_map(|line| {
            let (id, name) = line.split_once('\t')?;
            let id = id.trim();
            id.starts_with('@').then(|| OpenWindow::new(id, name))
        })
        .collect()
}

/// Derive the tmux session name for a repository directory name.
///
/// tmux rewrites `.` and `:` in session names to `_`.
pub fn session_name_for(repo_dir_name: &str) -> String {
    repo_dir_name.replace(['.', ':'], "_")
}
