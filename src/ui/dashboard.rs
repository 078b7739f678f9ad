//! Live worktree dashboard.
//!
//! Every refresh re-reads the catalog, the window set and per-worktree git
//! state; nothing is carried over between frames except the last snapshot,
//! which is only redrawn (never mutated) on resize.

use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table},
    DefaultTerminal, Frame,
};
use tracing::{debug, warn};

use super::theme::Theme;
use crate::catalog::{Catalog, WorktreeRecord};
use crate::commands::{RepoContext, CLOSED_MARKER, OPEN_MARKER};
use crate::git::{self, Divergence};
use crate::reconcile::WindowSet;
use crate::tmux::Multiplexer;

/// One worktree as shown in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub name: String,
    pub window_open: bool,
    pub modified: usize,
    pub divergence: Divergence,
    pub last_commit: String,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub repo_name: String,
    pub worktrees_label: String,
    pub default_branch: String,
    pub rows: Vec<DashboardRow>,
    /// Set when the catalog couldn't be read; shown instead of the table.
    pub error: Option<String>,
}

/// `clean`, `1 file` or `N files`.
pub fn modified_label(count: usize) -> String {
    match count {
        0 => "clean".to_string(),
        1 => "1 file".to_string(),
        n => format!("{n} files"),
    }
}

/// Cross-reference catalog and windows, asking `stats` for each record's git state.
pub fn build_rows<F>(catalog: &Catalog, windows: &WindowSet, mut stats: F) -> Vec<DashboardRow>
where
    F: FnMut(&WorktreeRecord) -> (usize, Divergence, String),
{
    catalog
        .iter()
        .map(|record| {
            let (modified, divergence, last_commit) = stats(record);
            DashboardRow {
                name: record.name(),
                window_open: windows.contains(record.leaf()),
                modified,
                divergence,
                last_commit,
            }
        })
        .collect()
}

/// Read a fresh snapshot from git and the multiplexer.
pub fn collect_snapshot(ctx: &RepoContext, mux: &dyn Multiplexer) -> Snapshot {
    let mut snapshot = Snapshot {
        repo_name: ctx.repo_name(),
        worktrees_label: ctx.worktrees_label(),
        default_branch: git::comparison_branch(&ctx.repo_root),
        ..Snapshot::default()
    };

    let catalog = match ctx.catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("Failed to read worktrees: {e:#}");
            snapshot.error = Some(format!("{e:#}"));
            return snapshot;
        }
    };

    let windows = WindowSet::read(mux, ctx.session()).unwrap_or_else(|e| {
        warn!("Failed to read windows: {e:#}");
        WindowSet::absent()
    });

    let default_branch = snapshot.default_branch.clone();
    snapshot.rows = build_rows(&catalog, &windows, |record| {
        let rev = record
            .branch
            .as_deref()
            .or(record.head.as_deref())
            .unwrap_or("HEAD");
        (
            git::modified_count(&record.path),
            git::divergence(&ctx.repo_root, rev, &default_branch),
            git::last_commit_relative(&record.path),
        )
    });
    debug!(rows = snapshot.rows.len(), "dashboard refreshed");
    snapshot
}

pub fn should_quit(key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

pub fn render(frame: &mut Frame, snapshot: &Snapshot, refresh: Duration) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], snapshot, refresh);

    if let Some(err) = &snapshot.error {
        let body = Paragraph::new(vec![
            Line::from(Span::styled(format!("  Error: {err}"), Theme::error())),
            Line::from(""),
            Line::from(Span::styled("  Retrying on next refresh.", Theme::muted())),
        ]);
        frame.render_widget(body, chunks[1]);
    } else if snapshot.rows.is_empty() {
        let body = Paragraph::new(vec![
            Line::from(format!(
                "  No worktrees found under {}",
                snapshot.worktrees_label
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "  Create one with: git worktree add {}<name> -b <branch>",
                    snapshot.worktrees_label
                ),
                Theme::muted(),
            )),
        ]);
        frame.render_widget(body, chunks[1]);
    } else {
        frame.render_widget(worktree_table(snapshot), chunks[1]);
    }

    render_footer(frame, chunks[2]);
}

fn render_header(frame: &mut Frame, area: Rect, snapshot: &Snapshot, refresh: Duration) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {} ", snapshot.repo_name), Theme::title_badge()),
        Span::styled(
            format!(
                " worktree dashboard (refreshes every {}s)",
                refresh.as_secs()
            ),
            Style::default().fg(Theme::TEXT_SECONDARY),
        ),
    ]));
    frame.render_widget(header, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("  {OPEN_MARKER} = tmux window open    {CLOSED_MARKER} = no tmux window"),
            Theme::muted(),
        ),
        Span::styled("    q", Style::default().fg(Theme::ACCENT)),
        Span::styled(" Quit", Theme::muted()),
    ]));
    frame.render_widget(footer, area);
}

fn worktree_table(snapshot: &Snapshot) -> Table<'static> {
    let headers = [
        "Branch".to_string(),
        "tmux".to_string(),
        "Modified".to_string(),
        format!("vs {}", snapshot.default_branch),
        "Last Commit".to_string(),
    ];

    let cells: Vec<[String; 5]> = snapshot
        .rows
        .iter()
        .map(|row| {
            [
                row.name.clone(),
                marker(row.window_open).to_string(),
                modified_label(row.modified),
                row.divergence.to_string(),
                row.last_commit.clone(),
            ]
        })
        .collect();

    let widths: Vec<Constraint> = (0..headers.len())
        .map(|i| {
            let widest = cells
                .iter()
                .map(|c| c[i].chars().count())
                .chain(std::iter::once(headers[i].chars().count()))
                .max()
                .unwrap_or(0);
            Constraint::Length(u16::try_from(widest).unwrap_or(u16::MAX))
        })
        .collect();

    let rows: Vec<Row> = snapshot
        .rows
        .iter()
        .zip(cells)
        .map(|(row, [name, mark, modified, divergence, last])| {
            Row::new(vec![
                Cell::from(Span::styled(
                    name,
                    Style::default().fg(Theme::BRANCH_NAME),
                )),
                Cell::from(Span::styled(mark, Theme::window_marker(row.window_open))),
                Cell::from(Span::styled(modified, Theme::modified(row.modified))),
                Cell::from(Span::styled(
                    divergence,
                    Theme::divergence(row.divergence.ahead, row.divergence.behind),
                )),
                Cell::from(Span::styled(
                    last,
                    Style::default().fg(Theme::TEXT_PRIMARY),
                )),
            ])
        })
        .collect();

    Table::new(rows, widths)
        .header(Row::new(headers.map(Cell::from)).style(Theme::header()))
        .column_spacing(2)
}

fn marker(open: bool) -> &'static str {
    if open {
        OPEN_MARKER
    } else {
        CLOSED_MARKER
    }
}

enum Wake {
    Refresh,
    Redraw,
    Quit,
}

/// Block until the next refresh is due, a resize needs a redraw, or a quit key.
fn wait(deadline: Instant) -> Result<Wake> {
    loop {
        let timeout = deadline.saturating_duration_since(Instant::now());
        if timeout.is_zero() {
            return Ok(Wake::Refresh);
        }
        if !event::poll(timeout)? {
            return Ok(Wake::Refresh);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press && should_quit(key) => {
                return Ok(Wake::Quit)
            }
            Event::Resize(..) => return Ok(Wake::Redraw),
            _ => {}
        }
    }
}

fn run_loop(
    terminal: &mut DefaultTerminal,
    ctx: &RepoContext,
    mux: &dyn Multiplexer,
    refresh: Duration,
) -> Result<()> {
    loop {
        let snapshot = collect_snapshot(ctx, mux);
        let deadline = Instant::now() + refresh;
        loop {
            terminal.draw(|frame| render(frame, &snapshot, refresh))?;
            match wait(deadline)? {
                Wake::Quit => return Ok(()),
                Wake::Refresh => break,
                Wake::Redraw => {}
            }
        }
    }
}

/// Run the dashboard until the user quits. Restores the terminal on exit.
pub fn run(ctx: &RepoContext, mux: &dyn Multiplexer, refresh: Duration) -> Result<()> {
    let mut terminal = ratatui::init();
    let res = run_loop(&mut terminal, ctx, mux, refresh);
    ratatui::restore();
    res
}
