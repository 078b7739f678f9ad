//! Error types surfaced to the user.
//!
//! Every variant is a condition the user can fix; `Display` renders the
//! message printed before exiting with a non-zero status.

use std::fmt;

use thiserror::Error;

/// Failure to resolve a query to exactly one worktree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The query matched nothing at any tier.
    #[error("No worktree matching '{query}'.{}", list_section("Available worktrees:", .available))]
    NoMatch {
        query: String,
        /// Relative paths of every worktree in the catalog.
        available: Vec<String>,
    },

    /// The query matched two or more worktrees in the same tier.
    #[error(
        "Ambiguous name '{query}' matches multiple worktrees:{}\nBe more specific (e.g., use the full path).",
        list_lines(.candidates)
    )]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },

    /// Several worktrees share the leaf name used as their window name.
    #[error(
        "Multiple worktrees share the leaf name '{leaf}':{}\nRename one worktree directory to make leaf names unique.",
        list_lines(.paths)
    )]
    LeafCollision { leaf: String, paths: Vec<String> },
}

/// A multiplexer operation the reconciler attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxOperation {
    CreateSession { session: String },
    CreateWindow { window: String },
    SwitchClient { window: String },
    KillWindow { window: String },
}

impl fmt::Display for MuxOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateSession { session } => write!(f, "create session '{session}'"),
            Self::CreateWindow { window } => write!(f, "create window '{window}'"),
            Self::SwitchClient { window } => write!(f, "switch to window '{window}'"),
            Self::KillWindow { window } => write!(f, "close window '{window}'"),
        }
    }
}

/// The multiplexer rejected a step of a reconciliation plan.
#[derive(Debug, Error)]
#[error("tmux failed to {operation}: {reason}")]
pub struct ReconcileError {
    pub operation: MuxOperation,
    pub reason: String,
}

impl ReconcileError {
    pub fn new(operation: MuxOperation, source: &anyhow::Error) -> Self {
        Self {
            operation,
            reason: format!("{source:#}"),
        }
    }
}

fn list_lines(items: &[String]) -> String {
    items.iter().map(|i| format!("\n  {i}")).collect()
}

fn list_section(header: &str, items: &[String]) -> String {
    if items.is_empty() {
        String::new()
    } else {
        format!("\n{header}{}", list_lines(items))
    }
}
