//! App: terminal front-end around a [`Session`].
//!
//! Architecture:
//! - `App` owns the session (poller + HTTP backend) and the preference jar.
//! - Terminal events arrive from a blocking reader task over `mpsc`.
//! - Request completions arrive on the session's own channel.
//! - A 1 s interval drives the poller's tick.
//! - Every frame is drawn from the session's `RegionBoard`.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use lfmp_client::{
    action::UserAction,
    backend::HttpBackend,
    keys::{Focus, ShortcutMap},
    session::{Completion, Session},
    view::{ButtonGroup, Region, RegionBoard, RegionContent},
};
use lfmp_proto::prefs::{Preference, PreferenceStore, UiPreferences};
use lfmp_proto::station::normalize_station_url;

use crate::theme::{self, LASTFM_RED, STOPPED};
use crate::widgets::{
    fit_width, progress_bar,
    status_bar::{self, InputMode},
};

pub struct App {
    session: Session<HttpBackend, RegionBoard>,
    completions: Option<mpsc::Receiver<Completion>>,
    shortcuts: ShortcutMap,
    prefs: PreferenceStore,
    ui_prefs: UiPreferences,
    /// Station entry prompt; `Some` while the text input has focus.
    station_input: Option<String>,
    bookmark_state: ListState,
    should_quit: bool,
}

impl App {
    pub fn new(
        session: Session<HttpBackend, RegionBoard>,
        completions: mpsc::Receiver<Completion>,
        shortcuts: ShortcutMap,
        prefs: PreferenceStore,
    ) -> Self {
        let ui_prefs = prefs.ui_preferences();
        Self {
            session,
            completions: Some(completions),
            shortcuts,
            prefs,
            ui_prefs,
            station_input: None,
            bookmark_state: ListState::default(),
            should_quit: false,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<Event>(256);

        // ── Background task: keyboard events ─────────────────────────────────
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if tx.blocking_send(ev).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        let mut completions = self
            .completions
            .take()
            .ok_or_else(|| anyhow::anyhow!("event loop already started"))?;

        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first interval tick completes immediately
        tick.tick().await;

        self.session.poll();

        loop {
            terminal.draw(|f| self.draw(f))?;

            if self.should_quit {
                info!("quit requested");
                break;
            }

            tokio::select! {
                Some(ev) = rx.recv() => self.handle_event(ev),
                Some(completion) = completions.recv() => self.session.on_completion(completion),
                _ = tick.tick() => self.session.tick(),
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, ev: Event) {
        if let Event::Key(key) = ev {
            if key.kind == KeyEventKind::Press {
                self.handle_key(key);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.station_input.is_some() {
            if let Some(action) = self.shortcuts.resolve_event(&key, Focus::TextInput) {
                self.session.perform(&action);
                return;
            }
            self.handle_input_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_bookmark(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_bookmark(1),
            KeyCode::Char('c') => {
                if let Some(url) = self.selected_bookmark_url() {
                    self.session.perform(&UserAction::ChangeStation(url));
                }
            }
            KeyCode::Char('s') => self.follow_station_link(Region::SimilarLink),
            KeyCode::Char('f') => self.follow_station_link(Region::FansLink),
            KeyCode::Char('/') => self.station_input = Some(String::new()),
            KeyCode::Char(c @ '1'..='5') => self.toggle_preference(c),
            _ => {
                if let Some(action) = self.shortcuts.resolve_event(&key, Focus::Normal) {
                    self.session.perform(&action);
                }
            }
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let Some(input) = self.station_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.station_input = None,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Enter => {
                let text = input.trim().to_string();
                self.station_input = None;
                if !text.is_empty() {
                    let url = normalize_station_url(&text);
                    self.session.perform(&UserAction::ChangeStation(url));
                }
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
    }

    fn move_bookmark(&mut self, delta: i32) {
        let len = self.session.view().bookmarks.len();
        if len == 0 {
            self.bookmark_state.select(None);
            return;
        }
        let current = self.bookmark_state.selected().unwrap_or(0) as i32;
        let next = (current + delta).rem_euclid(len as i32) as usize;
        self.bookmark_state.select(Some(next));
    }

    fn selected_bookmark_url(&self) -> Option<String> {
        let bookmarks = &self.session.view().bookmarks;
        let idx = self.bookmark_state.selected().unwrap_or(0);
        bookmarks.get(idx).map(|b| b.url.clone())
    }

    fn follow_station_link(&mut self, region: Region) {
        let station = match self.session.view().get(region) {
            Some(RegionContent::StationLink { station, .. }) if self.session.poller().is_streaming() => {
                station.clone()
            }
            _ => return,
        };
        self.session.perform(&UserAction::ChangeStation(station));
    }

    fn toggle_preference(&mut self, digit: char) {
        let idx = digit as usize - '1' as usize;
        let Some(pref) = Preference::ALL.get(idx).copied() else {
            return;
        };
        match self.prefs.toggle(pref) {
            Ok(value) => info!("preference {} -> {}", pref.label(), value),
            Err(e) => warn!("failed to save preference {}: {}", pref.key(), e),
        }
        self.ui_prefs = self.prefs.ui_preferences();
    }

    // ── Drawing ──────────────────────────────────────────────────────────────

    fn draw(&mut self, f: &mut Frame) {
        let area = f.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // title
                Constraint::Length(8), // now playing
                Constraint::Length(1), // progress
                Constraint::Length(1), // separator
                Constraint::Min(3),    // lists
                Constraint::Length(1), // prompt / prefs
                Constraint::Length(1), // debug
                Constraint::Length(1), // keys
            ])
            .split(area);

        self.draw_title(f, rows[0]);
        self.draw_now_playing(f, rows[1]);
        self.draw_progress(f, rows[2]);
        status_bar::draw_separator(f, rows[3]);
        self.draw_lists(f, rows[4]);
        self.draw_prompt_or_prefs(f, rows[5]);

        let board = self.session.view();
        status_bar::draw_debug_bar(
            f,
            rows[6],
            board.text(Region::Debug),
            self.session.poller().poll_in_flight(),
        );
        let mode = if self.station_input.is_some() {
            InputMode::Station
        } else {
            InputMode::Normal
        };
        status_bar::draw_keys_bar(f, rows[7], mode, board.buttons);
    }

    fn draw_title(&self, f: &mut Frame, area: Rect) {
        let board = self.session.view();
        let title = if board.title.is_empty() {
            "LastFMProxy"
        } else {
            board.title.as_str()
        };
        let (badge, color) = match board.buttons {
            Some(ButtonGroup::Streaming) => ("▶ on air", LASTFM_RED),
            Some(ButtonGroup::Start) => ("■ stopped", STOPPED),
            None => ("… connecting", STOPPED),
        };
        let width = area.width.saturating_sub(badge.chars().count() as u16 + 2) as usize;
        let line = Line::from(vec![
            Span::styled(format!(" {} ", badge), Style::default().fg(color)),
            Span::styled(fit_width(title, width), theme::text()),
        ]);
        f.render_widget(Paragraph::new(line), area);
    }

    fn region_line(&self, label: &str, region: Region, width: usize) -> Line<'static> {
        let content = self.session.view().get(region);
        let value_style = match content {
            Some(RegionContent::Link { href, .. }) if !href.is_empty() => theme::link(),
            _ => theme::text(),
        };
        let text = content.map(|c| c.display()).unwrap_or("");
        Line::from(vec![
            Span::styled(format!("{:>9} ", label), theme::label()),
            Span::styled(fit_width(text, width.saturating_sub(10)), value_style),
        ])
    }

    fn draw_now_playing(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme::rule())
            .title(Span::styled(" now playing ", theme::label()));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let width = inner.width as usize;
        let board = self.session.view();
        let mut lines = Vec::new();
        lines.push(self.region_line("station", Region::Station, width));
        if self.ui_prefs.show_artist {
            lines.push(self.region_line("artist", Region::Artist, width));
        }
        if self.ui_prefs.show_album {
            lines.push(self.region_line("album", Region::Album, width));
        }
        lines.push(self.region_line("track", Region::Track, width));
        if self.ui_prefs.show_genre {
            let sim = board.text(Region::SimilarLink);
            let fans = board.text(Region::FansLink);
            let links = if sim.is_empty() && fans.is_empty() {
                String::new()
            } else {
                format!("[{}] [{}]", sim, fans)
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{:>9} ", "related"), theme::label()),
                Span::styled(links, theme::station_link()),
            ]));
        }
        lines.push(self.region_line("cover", Region::Cover, width));
        if self.ui_prefs.show_rating {
            let mark = if board.record_to_profile { "[x]" } else { "[ ]" };
            lines.push(Line::from(vec![
                Span::styled(format!("{:>9} ", "scrobble"), theme::label()),
                Span::styled(mark, theme::text()),
            ]));
        }
        f.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_progress(&self, f: &mut Frame, area: Rect) {
        if !self.ui_prefs.show_duration {
            return;
        }
        let poller = self.session.poller();
        let label = self.session.view().text(Region::Duration).to_string();
        progress_bar::draw_progress(
            f,
            area,
            poller.track_progress(),
            poller.track_duration(),
            &label,
        );
    }

    fn draw_lists(&mut self, f: &mut Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let board = self.session.view();
        let recent: Vec<ListItem> = board
            .recent_tracks
            .iter()
            .map(|t| ListItem::new(fit_width(t, cols[0].width.saturating_sub(2) as usize)))
            .collect();
        let recent = List::new(recent).style(theme::text()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme::rule())
                .title(Span::styled(" recent ", theme::label())),
        );
        f.render_widget(recent, cols[0]);

        let bookmarks: Vec<ListItem> = board
            .bookmarks
            .iter()
            .map(|b| ListItem::new(b.label.clone()))
            .collect();
        if !bookmarks.is_empty() && self.bookmark_state.selected().is_none() {
            self.bookmark_state.select(Some(0));
        }
        if let Some(sel) = self.bookmark_state.selected() {
            if sel >= bookmarks.len() {
                self.bookmark_state
                    .select(bookmarks.len().checked_sub(1));
            }
        }
        let list = List::new(bookmarks)
            .style(theme::text())
            .highlight_style(theme::highlight())
            .highlight_symbol("▸ ")
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme::rule())
                    .title(Span::styled(" stations ", theme::label())),
            );
        f.render_stateful_widget(list, cols[1], &mut self.bookmark_state);
    }

    fn draw_prompt_or_prefs(&self, f: &mut Frame, area: Rect) {
        if let Some(input) = &self.station_input {
            let line = Line::from(vec![
                Span::styled(" station: ", theme::label()),
                Span::styled(format!("{}▏", input), theme::prompt()),
            ]);
            f.render_widget(Paragraph::new(line), area);
            return;
        }

        let mut spans = vec![Span::styled(" columns:", theme::faint())];
        for (i, pref) in Preference::ALL.iter().enumerate() {
            let on = self.ui_prefs.get(*pref);
            spans.push(Span::styled(
                format!(" {}:{}{}", i + 1, if on { "+" } else { "-" }, pref.label()),
                if on { theme::text() } else { theme::faint() },
            ));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

/// Build the HTTP-backed session the binary runs.
pub fn build_session(
    base_url: &str,
    config: &lfmp_proto::config::PollingConfig,
) -> anyhow::Result<(Session<HttpBackend, RegionBoard>, mpsc::Receiver<Completion>)> {
    let backend = HttpBackend::new(base_url, config.request_timeout())?;
    let poller = lfmp_client::poller::Poller::new(config.into(), RegionBoard::new());
    Ok(Session::new(poller, Arc::new(backend)))
}
