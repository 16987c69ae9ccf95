//! Colours and styles of the lfmp TUI.

use ratatui::style::{Color, Modifier, Style};

// Last.fm red for anything that means "playing".
pub const LASTFM_RED: Color = Color::Rgb(213, 16, 7);
pub const STOPPED: Color = Color::Rgb(230, 170, 70);
pub const PENDING: Color = Color::Rgb(240, 110, 90);
pub const IDLE: Color = Color::Rgb(90, 190, 110);

pub const TEXT: Color = Color::Rgb(220, 218, 214);
pub const LABEL: Color = Color::Rgb(128, 124, 120);
pub const FAINT: Color = Color::Rgb(78, 75, 72);
pub const RULE: Color = Color::Rgb(48, 45, 43);
pub const LINK: Color = Color::Rgb(110, 160, 215);
pub const STATION_LINK: Color = Color::Rgb(190, 130, 210);

pub const PROMPT_FG: Color = Color::Rgb(250, 205, 90);
pub const PROMPT_BG: Color = Color::Rgb(28, 24, 22);
pub const HIGHLIGHT_BG: Color = Color::Rgb(50, 22, 20);

pub fn text() -> Style {
    Style::default().fg(TEXT)
}

pub fn label() -> Style {
    Style::default().fg(LABEL)
}

pub fn faint() -> Style {
    Style::default().fg(FAINT)
}

pub fn rule() -> Style {
    Style::default().fg(RULE)
}

pub fn link() -> Style {
    Style::default().fg(LINK).add_modifier(Modifier::UNDERLINED)
}

pub fn station_link() -> Style {
    Style::default().fg(STATION_LINK)
}

pub fn prompt() -> Style {
    Style::default().fg(PROMPT_FG).bg(PROMPT_BG)
}

pub fn highlight() -> Style {
    Style::default()
        .fg(TEXT)
        .bg(HIGHLIGHT_BG)
        .add_modifier(Modifier::BOLD)
}

/// Mode badge in the key hints bar.
pub fn badge(color: Color) -> Style {
    Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD)
}
