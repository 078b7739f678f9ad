use ratatui::style::{Color, Modifier, Style};

/// Color and style constants for the dashboard.
pub struct Theme;

impl Theme {
    // ── Accent ──────────────────────────────────────────────────────────────

    pub const ACCENT: Color = Color::Cyan;

    // ── Window state ────────────────────────────────────────────────────────

    pub const WINDOW_OPEN: Color = Color::Green;
    pub const WINDOW_CLOSED: Color = Color::DarkGray;

    // ── Text hierarchy ──────────────────────────────────────────────────────

    pub const TEXT_PRIMARY: Color = Color::White;
    pub const TEXT_SECONDARY: Color = Color::Gray;
    pub const TEXT_MUTED: Color = Color::DarkGray;

    // ── Git state ───────────────────────────────────────────────────────────

    pub const BRANCH_NAME: Color = Color::Green;
    pub const DIRTY: Color = Color::Yellow;
    pub const AHEAD: Color = Color::Green;
    pub const BEHIND: Color = Color::Red;

    pub const ERROR: Color = Color::Red;
    pub const INVERTED_FG: Color = Color::Black;

    // ── Composite styles ────────────────────────────────────────────────────

    /// Title badge: bold black on accent background.
    pub fn title_badge() -> Style {
        Style::default()
            .fg(Self::INVERTED_FG)
            .bg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Column headers.
    pub fn header() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    pub fn error() -> Style {
        Style::default().fg(Self::ERROR)
    }

    pub fn window_marker(open: bool) -> Style {
        Style::default().fg(if open {
            Self::WINDOW_OPEN
        } else {
            Self::WINDOW_CLOSED
        })
    }

    pub fn modified(count: usize) -> Style {
        if count == 0 {
            Self::muted()
        } else {
            Style::default().fg(Self::DIRTY)
        }
    }

    pub fn divergence(ahead: usize, behind: usize) -> Style {
        match (ahead, behind) {
            (0, 0) => Self::muted(),
            (_, 0) => Style::default().fg(Self::AHEAD),
            _ => Style::default().fg(Self::BEHIND),
        }
    }
}
