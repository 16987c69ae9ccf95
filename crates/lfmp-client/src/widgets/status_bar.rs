//! Footer lines: debug echo, separator and key hints.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use lfmp_client::view::ButtonGroup;

use super::fit_width;
use crate::theme::{self, IDLE, LASTFM_RED, PENDING, PROMPT_FG, STOPPED};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Station,
}

/// The last request path or raw response, behind a dot that shows whether
/// a poll is outstanding.
pub fn draw_debug_bar(frame: &mut Frame, area: Rect, debug: &str, request_pending: bool) {
    let (dot, color) = if request_pending {
        ("◌", PENDING)
    } else {
        ("●", IDLE)
    };
    // multi-line payloads collapse to one line
    let flat = debug.split_whitespace().collect::<Vec<_>>().join(" ");
    let line = Line::from(vec![
        Span::styled(format!("{} ", dot), Style::default().fg(color)),
        Span::styled(
            fit_width(&flat, area.width.saturating_sub(2) as usize),
            theme::faint(),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let rule = "┄".repeat(area.width as usize);
    frame.render_widget(Paragraph::new(Span::styled(rule, theme::rule())), area);
}

fn hints(mode: InputMode, buttons: Option<ButtonGroup>) -> &'static [(&'static str, &'static str)] {
    match (mode, buttons) {
        (InputMode::Station, _) => &[("Enter", "tune"), ("Esc", "cancel")],
        (InputMode::Normal, Some(ButtonGroup::Streaming)) => &[
            ("Space", "skip"),
            ("Enter", "love"),
            ("Bksp", "ban"),
            ("e", "scrobble"),
            ("r", "refresh"),
            ("s/f", "similar/fans"),
            ("↑↓ c", "bookmark"),
            ("/", "station"),
            ("1-5", "columns"),
            ("q", "quit"),
        ],
        (InputMode::Normal, _) => &[
            ("↑↓ c", "start bookmark"),
            ("/", "start station"),
            ("r", "refresh"),
            ("1-5", "columns"),
            ("q", "quit"),
        ],
    }
}

/// Key hints for the visible button group; the badge shows whether the
/// radio is playing, stopped, or the prompt is open.
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, buttons: Option<ButtonGroup>) {
    let (badge, color) = match (mode, buttons) {
        (InputMode::Station, _) => ("STATION", PROMPT_FG),
        (_, Some(ButtonGroup::Streaming)) => ("ON AIR", LASTFM_RED),
        _ => ("OFF", STOPPED),
    };

    let mut spans = vec![Span::styled(format!(" {} ", badge), theme::badge(color))];
    for (key, what) in hints(mode, buttons) {
        spans.push(Span::styled(format!(" {}", key), theme::text()));
        spans.push(Span::styled(format!(" {}", what), theme::label()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
