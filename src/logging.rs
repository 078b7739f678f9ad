//! tracing subscriber setup.
//!
//! Line-oriented commands log to stderr. The dashboard owns the terminal, so
//! it logs to a file in the log directory instead.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log file name inside [`crate::paths::log_directory`].
pub const LOG_FILE_NAME: &str = "worktree-mux.log";

/// `RUST_LOG` if set, otherwise warnings only.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter())
        .without_time()
        .try_init();
}

/// Log to `<log dir>/worktree-mux.log`. Keep the guard alive until exit.
pub fn init_file() -> Result<WorkerGuard> {
    let dir = crate::paths::log_directory()
        .context("Cannot resolve log directory (is HOME set?)")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(env_filter())
        .try_init();

    Ok(guard)
}
