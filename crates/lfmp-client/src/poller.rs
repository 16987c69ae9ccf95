//! Poller/Renderer: the now-playing state machine.
//!
//! Owns the refresh countdown, the local progress clock and the in-flight
//! guard, and renders every decoded response into a [`View`]. It performs
//! no I/O: callers get a [`Request`] back when something should be sent
//! and hand it back with the outcome to [`Poller::complete`]. See `session.rs` for the
//! async side.

use std::time::{Duration, Instant};

use lfmp_proto::clock::fmt_progress;
use lfmp_proto::config::PollingConfig;
use lfmp_proto::protocol::{decode_status, Endpoint};
use lfmp_proto::station::{fans_station, similar_artists_station};
use lfmp_proto::status::StatusUpdate;
use tracing::{debug, info, warn};

use crate::action::UserAction;
use crate::error::ClientError;
use crate::view::{ButtonGroup, Region, RegionContent, UpdateOrigin, View, DEFAULT_COVER};

pub const START_LABEL: &str = "Start radio";

/// A request the caller should send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub endpoint: Endpoint,
    /// Sequence number of a poll; `None` for one-shot actions.
    pub poll_seq: Option<u64>,
}

impl Request {
    fn action(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            poll_seq: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    seq: u64,
    started: Instant,
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub baseline_refresh_secs: i64,
    pub idle_refresh_secs: i64,
    pub min_refresh_secs: i64,
    pub max_refresh_secs: i64,
    pub request_timeout: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollerSettings {
    fn from(cfg: &PollingConfig) -> Self {
        Self {
            baseline_refresh_secs: cfg.baseline_refresh_secs,
            idle_refresh_secs: cfg.idle_refresh_secs,
            min_refresh_secs: cfg.min_refresh_secs.min(cfg.max_refresh_secs),
            max_refresh_secs: cfg.max_refresh_secs,
            request_timeout: cfg.request_timeout(),
        }
    }
}

pub struct Poller<V: View> {
    settings: PollerSettings,
    view: V,
    /// `None` until the first render, so the first response always picks a
    /// button group.
    streaming: Option<bool>,
    track_progress: i64,
    track_duration: i64,
    refresh_timer: i64,
    in_flight: Option<InFlight>,
    next_poll_seq: u64,
    record_to_profile: bool,
}

impl<V: View> Poller<V> {
    pub fn new(settings: PollerSettings, view: V) -> Self {
        Self {
            settings,
            view,
            streaming: None,
            track_progress: 0,
            track_duration: 0,
            refresh_timer: 0,
            in_flight: None,
            next_poll_seq: 0,
            record_to_profile: false,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming == Some(true)
    }

    pub fn track_progress(&self) -> i64 {
        self.track_progress
    }

    pub fn track_duration(&self) -> i64 {
        self.track_duration
    }

    pub fn refresh_timer(&self) -> i64 {
        self.refresh_timer
    }

    pub fn poll_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn record_to_profile(&self) -> bool {
        self.record_to_profile
    }

    /// Write a region; a region the view does not bind is noted in `debug`.
    fn set(&mut self, region: Region, content: RegionContent) {
        if !self.view.set_region(region, content) && region != Region::Debug {
            self.view
                .set_region(Region::Debug, RegionContent::Text(format!("err:{}", region.id())));
        }
    }

    /// Start a poll unless one is already outstanding.
    pub fn poll(&mut self, now: Instant) -> Option<Request> {
        if self.in_flight.is_some() {
            debug!("poll skipped: request already in flight");
            return None;
        }
        let seq = self.next_poll_seq;
        self.next_poll_seq += 1;
        self.in_flight = Some(InFlight { seq, started: now });
        let endpoint = Endpoint::NowPlaying;
        self.set(Region::Debug, RegionContent::Text(endpoint.path()));
        Some(Request {
            endpoint,
            poll_seq: Some(seq),
        })
    }

    /// Apply a user action: show its placeholder and return the request to
    /// send. `Refresh` is a poll and honours the in-flight guard.
    pub fn action(&mut self, action: &UserAction, now: Instant) -> Option<Request> {
        if *action == UserAction::Refresh {
            return self.poll(now);
        }
        if let Some(label) = action.pending_label() {
            self.set(Region::Station, RegionContent::text(label));
        }
        let endpoint = action.endpoint(self.record_to_profile);
        if *action == UserAction::ToggleRecordToProfile {
            // each press flips again, even before the backend answers
            self.record_to_profile = !self.record_to_profile;
            self.view
                .set_record_to_profile(self.record_to_profile, UpdateOrigin::User);
        }
        info!("action {:?} -> {}", action, endpoint.path());
        self.set(Region::Debug, RegionContent::Text(endpoint.path()));
        Some(Request::action(endpoint))
    }

    /// Feed back the outcome of a request started by `poll` or `action`.
    /// Only the poll currently holding the guard releases it; a late answer
    /// to an abandoned poll is still rendered.
    pub fn complete(&mut self, request: &Request, outcome: Result<String, ClientError>) {
        let endpoint = &request.endpoint;
        if let Some(seq) = request.poll_seq {
            match self.in_flight {
                Some(current) if current.seq == seq => self.in_flight = None,
                _ => debug!("poll {} finished after being abandoned", seq),
            }
        }
        match outcome {
            Ok(body) => {
                self.set(Region::Debug, RegionContent::Text(body.clone()));
                match decode_status(&body) {
                    Ok(update) => self.render(&update),
                    Err(e) => warn!("ignoring unparsable response from {}: {}", endpoint.path(), e),
                }
            }
            Err(e) => {
                warn!("{}", e);
                self.set(Region::Debug, RegionContent::Text(format!("error: {}", e)));
            }
        }
    }

    fn show_buttons(&mut self, streaming: bool) {
        if self.streaming != Some(streaming) {
            self.view.show_buttons(if streaming {
                ButtonGroup::Streaming
            } else {
                ButtonGroup::Start
            });
            self.streaming = Some(streaming);
        }
    }

    pub fn render(&mut self, update: &StatusUpdate) {
        if let Some(tracks) = &update.recent_tracks {
            self.view.replace_recent_tracks(tracks);
        }
        if let Some(bookmarks) = &update.bookmarks {
            self.view
                .replace_bookmarks(bookmarks, UpdateOrigin::Programmatic);
        }

        let status = &update.playback;
        if let Some(result) = &update.result {
            self.set(Region::Station, RegionContent::text(result.clone()));
            self.refresh_timer = self.settings.idle_refresh_secs;
        } else if !status.is_streaming {
            for region in [Region::Artist, Region::Album, Region::Track, Region::Duration] {
                self.set(region, RegionContent::Blank);
            }
            self.set(
                Region::Cover,
                RegionContent::Image {
                    src: DEFAULT_COVER.to_string(),
                },
            );
            self.set(Region::Station, RegionContent::text(START_LABEL));

            self.track_progress = 0;
            self.track_duration = 0;
            self.refresh_timer = self.settings.idle_refresh_secs;
            self.show_buttons(false);
        } else {
            self.set(
                Region::Artist,
                RegionContent::link(&status.creator, &status.artist_page),
            );
            self.set(
                Region::Album,
                RegionContent::link(&status.album, &status.album_page),
            );
            self.set(
                Region::Track,
                RegionContent::link(&status.title, &status.track_page),
            );
            self.set(
                Region::Cover,
                RegionContent::Image {
                    src: status
                        .cover_image
                        .clone()
                        .unwrap_or_else(|| DEFAULT_COVER.to_string()),
                },
            );
            self.set(
                Region::SimilarLink,
                RegionContent::StationLink {
                    text: "sim".to_string(),
                    station: similar_artists_station(&status.creator),
                },
            );
            self.set(
                Region::FansLink,
                RegionContent::StationLink {
                    text: "fans".to_string(),
                    station: fans_station(&status.creator),
                },
            );

            self.track_progress = status.track_progress_secs();
            self.track_duration = status.track_duration_secs();
            if self.track_duration > 0 {
                self.track_progress = self.track_progress.min(self.track_duration);
                self.refresh_timer = self.track_duration - self.track_progress;
            }
            self.refresh_timer = self
                .refresh_timer
                .clamp(self.settings.min_refresh_secs, self.settings.max_refresh_secs);

            self.set(
                Region::Station,
                RegionContent::text(status.station_label.clone()),
            );
            self.view.set_title(&format!(
                "{} - {} - LastFMProxy",
                status.creator, status.title
            ));

            self.record_to_profile = status.record_to_profile;
            self.view
                .set_record_to_profile(status.record_to_profile, UpdateOrigin::Programmatic);

            self.show_buttons(true);
        }
    }

    /// One-second heartbeat. Returns the poll to send when the refresh
    /// countdown runs out.
    pub fn tick(&mut self, now: Instant) -> Option<Request> {
        if self.track_progress != 0 || self.track_duration != 0 {
            self.set(
                Region::Duration,
                RegionContent::Text(fmt_progress(
                    self.track_progress.max(0) as u64,
                    self.track_duration.max(0) as u64,
                )),
            );
            if self.track_duration == 0 || self.track_progress < self.track_duration {
                self.track_progress = self.track_progress.saturating_add(1);
            }
        }

        if let Some(current) = self.in_flight {
            if now.saturating_duration_since(current.started) >= self.settings.request_timeout {
                warn!(
                    "poll unanswered after {:?}; clearing in-flight guard",
                    self.settings.request_timeout
                );
                self.in_flight = None;
                // retry on this tick
                self.refresh_timer = 1;
            }
        }

        self.refresh_timer -= 1;
        if self.refresh_timer <= 0 {
            self.refresh_timer = self.settings.baseline_refresh_secs;
            return self.poll(now);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::RegionBoard;
    use lfmp_proto::status::PlaybackStatus;

    fn poller() -> Poller<RegionBoard> {
        Poller::new(PollerSettings::default(), RegionBoard::new())
    }

    fn streaming(progress: i64, duration_ms: i64) -> StatusUpdate {
        StatusUpdate {
            playback: PlaybackStatus {
                is_streaming: true,
                creator: "Band".into(),
                title: "Song".into(),
                reported_progress_secs: progress,
                track_duration_millis: duration_ms,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn refresh_delay_is_clamped() {
        let mut p = poller();
        for (progress, duration_ms) in [(0, 200_000), (199, 200_000), (195, 200_000), (10, 12_000), (500, 200_000)] {
            p.render(&streaming(progress, duration_ms));
            assert!((2..=15).contains(&p.refresh_timer()), "{}", p.refresh_timer());
            assert!(p.track_progress() <= p.track_duration());
        }
        p.render(&streaming(195, 200_000));
        assert_eq!(p.refresh_timer(), 5);
    }

    #[test]
    fn unknown_duration_clamps_current_timer() {
        let mut p = poller();
        p.render(&streaming(30, 0));
        assert_eq!(p.refresh_timer(), 2);
        assert_eq!(p.track_progress(), 30);
    }

    #[test]
    fn result_message_overrides_station_label() {
        let mut p = poller();
        p.render(&StatusUpdate {
            result: Some("OK, scrobbling disabled.".into()),
            ..Default::default()
        });
        assert_eq!(p.view().text(Region::Station), "OK, scrobbling disabled.");
        assert_eq!(p.refresh_timer(), 5);
        // button group untouched: no streaming state learnt yet
        assert_eq!(p.view().buttons, None);
    }

    #[test]
    fn first_render_always_picks_buttons() {
        let mut p = poller();
        p.render(&StatusUpdate::default());
        assert_eq!(p.view().buttons, Some(ButtonGroup::Start));
    }

    #[test]
    fn tick_counts_up_and_stops_at_duration() {
        let mut p = poller();
        p.render(&streaming(198, 200_000));
        let now = Instant::now();
        p.tick(now);
        assert_eq!(p.view().text(Region::Duration), "3:18 / 3:20");
        p.tick(now);
        p.tick(now);
        p.tick(now);
        assert_eq!(p.track_progress(), 200);
        assert_eq!(p.view().text(Region::Duration), "3:20 / 3:20");
    }

    #[test]
    fn tick_leaves_duration_alone_when_idle() {
        let mut p = poller();
        p.render(&StatusUpdate::default());
        p.tick(Instant::now());
        assert_eq!(p.view().get(Region::Duration), Some(&RegionContent::Blank));
    }

    #[test]
    fn countdown_fires_poll_and_rearms_baseline() {
        let mut p = poller();
        p.render(&StatusUpdate::default());
        let now = Instant::now();
        for _ in 0..4 {
            assert!(p.tick(now).is_none());
        }
        assert_eq!(p.tick(now).map(|r| r.endpoint), Some(Endpoint::NowPlaying));
        assert_eq!(p.refresh_timer(), 60);
        assert!(p.poll_in_flight());
    }

    #[test]
    fn stale_guard_is_cleared() {
        let mut p = poller();
        let start = Instant::now();
        assert!(p.poll(start).is_some());
        assert!(p.poll(start).is_none());
        p.tick(start + Duration::from_secs(5));
        assert!(p.poll_in_flight());
        // abandoned poll is retried on the same tick
        assert_eq!(
            p.tick(start + Duration::from_secs(11)).map(|r| r.endpoint),
            Some(Endpoint::NowPlaying)
        );
        assert!(p.poll_in_flight());
    }

    #[test]
    fn abandoned_poll_does_not_release_its_replacement() {
        let mut p = poller();
        let start = Instant::now();
        let first = p.poll(start).unwrap();
        let second = p.tick(start + Duration::from_secs(11)).unwrap();
        assert_ne!(first.poll_seq, second.poll_seq);

        p.complete(
            &first,
            Err(ClientError::Timeout {
                path: "/np".into(),
                secs: 10,
            }),
        );
        assert!(p.poll_in_flight());
        assert!(p.poll(start + Duration::from_secs(12)).is_none());

        p.complete(&second, Ok("np_streaming = 0;".into()));
        assert!(!p.poll_in_flight());
        assert!(p.poll(start + Duration::from_secs(13)).is_some());
    }

    #[test]
    fn late_answer_to_abandoned_poll_still_renders() {
        let mut p = poller();
        let start = Instant::now();
        let first = p.poll(start).unwrap();
        p.tick(start + Duration::from_secs(11)).unwrap();
        p.complete(&first, Ok("np_streaming = 0;".into()));
        assert_eq!(p.view().text(Region::Station), START_LABEL);
        assert!(p.poll_in_flight());
    }

    #[test]
    fn actions_never_touch_the_guard() {
        let mut p = poller();
        let now = Instant::now();
        p.poll(now).unwrap();
        let love = p.action(&UserAction::Love, now).unwrap();
        assert_eq!(love.poll_seq, None);
        p.complete(&love, Ok("np_streaming = 0;".into()));
        assert!(p.poll_in_flight());
    }

    #[test]
    fn failed_poll_keeps_previous_display() {
        let mut p = poller();
        p.render(&streaming(10, 200_000));
        let ep = p.poll(Instant::now()).unwrap();
        p.complete(&ep, Ok("np_title = window.location;".into()));
        assert!(!p.poll_in_flight());
        assert_eq!(p.view().text(Region::Artist), "Band");
        assert_eq!(p.view().text(Region::Debug), "np_title = window.location;");
    }

    #[test]
    fn toggle_uses_last_known_state() {
        let mut p = poller();
        let mut update = streaming(0, 100_000);
        update.playback.record_to_profile = true;
        p.render(&update);
        assert!(p.view().record_to_profile);
        let now = Instant::now();
        let first = p.action(&UserAction::ToggleRecordToProfile, now);
        assert_eq!(first.map(|r| r.endpoint), Some(Endpoint::RecordToProfile(false)));
        assert!(!p.view().record_to_profile);
        assert_eq!(p.view().text(Region::Station), "Toggling Record to profile...");

        // a second press before any answer goes back the other way
        let second = p.action(&UserAction::ToggleRecordToProfile, now);
        assert_eq!(second.map(|r| r.endpoint), Some(Endpoint::RecordToProfile(true)));
        assert!(p.view().record_to_profile);
        assert_eq!(Endpoint::RecordToProfile(true).path(), "/rtp");
    }

    #[test]
    fn progress_tick_saturates() {
        let mut p = poller();
        let mut update = streaming(0, 0);
        update.playback.metadata_age_secs = i64::MAX;
        p.render(&update);
        assert_eq!(p.track_progress(), i64::MAX);
        p.tick(Instant::now());
        assert_eq!(p.track_progress(), i64::MAX);
    }
}
