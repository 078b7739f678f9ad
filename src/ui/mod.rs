//! Terminal UI for `dash`.

pub mod dashboard;
pub mod theme;
