//! Keyboard shortcuts.
//!
//! Shortcuts are defined on browser-style key codes so the mapping stays
//! the same whatever the input backend is; terminal key events are
//! translated first.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::UserAction;

pub const KEY_BACKSPACE: u32 = 8;
pub const KEY_ENTER: u32 = 13;
pub const KEY_SPACE: u32 = 32;
pub const KEY_E: u32 = 69;
pub const KEY_R: u32 = 82;

/// Where keyboard focus currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Normal,
    TextInput,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShortcutMap {
    /// When false (default) shortcuts are swallowed while typing.
    pub allow_in_text_input: bool,
}

impl ShortcutMap {
    pub fn new(allow_in_text_input: bool) -> Self {
        Self {
            allow_in_text_input,
        }
    }

    pub fn resolve(&self, key_code: u32, focus: Focus) -> Option<UserAction> {
        if focus == Focus::TextInput && !self.allow_in_text_input {
            return None;
        }
        match key_code {
            KEY_BACKSPACE => Some(UserAction::Ban),
            KEY_ENTER => Some(UserAction::Love),
            KEY_SPACE => Some(UserAction::Skip),
            KEY_E => Some(UserAction::ToggleRecordToProfile),
            KEY_R => Some(UserAction::Refresh),
            _ => None,
        }
    }

    pub fn resolve_event(&self, key: &KeyEvent, focus: Focus) -> Option<UserAction> {
        key_code(key).and_then(|code| self.resolve(code, focus))
    }
}

/// Browser key code for a terminal key event. Letters map to their
/// upper-case code; modified keys have none.
pub fn key_code(key: &KeyEvent) -> Option<u32> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    match key.code {
        KeyCode::Backspace => Some(KEY_BACKSPACE),
        KeyCode::Enter => Some(KEY_ENTER),
        KeyCode::Char(' ') => Some(KEY_SPACE),
        KeyCode::Char(c) if c.is_ascii_alphanumeric() => Some(c.to_ascii_uppercase() as u32),
        _ => None,
    }
}
