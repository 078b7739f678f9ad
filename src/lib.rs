//! worktree-mux: a tmux view over a repository's git worktrees.
//!
//! Each worktree under the worktrees root gets a window named after its leaf
//! directory in a session named after the repository.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod git;
pub mod logging;
pub mod paths;
pub mod reconcile;
pub mod resolve;
pub mod tmux;
pub mod ui;
