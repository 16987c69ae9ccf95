//! End-to-end poller behaviour through a [`Session`] with a scripted backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use lfmp_client::action::UserAction;
use lfmp_client::backend::Backend;
use lfmp_client::error::ClientError;
use lfmp_client::keys::{Focus, ShortcutMap};
use lfmp_client::poller::{Poller, PollerSettings, START_LABEL};
use lfmp_client::session::{Completion, Session};
use lfmp_client::view::{ButtonGroup, Region, RegionBoard, RegionContent, DEFAULT_COVER};
use lfmp_proto::protocol::Endpoint;

fn route(endpoint: &Endpoint) -> &'static str {
    match endpoint {
        Endpoint::NowPlaying => "np",
        Endpoint::Skip { .. } => "skip",
        Endpoint::Love => "love",
        Endpoint::Ban => "ban",
        Endpoint::ChangeStation(_) => "changestation",
        Endpoint::RecordToProfile(_) => "rtp",
    }
}

/// Answers each route with a canned body; optionally holds every request
/// until the gate is opened.
#[derive(Default)]
struct ScriptedBackend {
    bodies: Mutex<HashMap<&'static str, Result<String, u16>>>,
    requests: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    fn answer(self, route: &'static str, body: &str) -> Self {
        self.bodies
            .lock()
            .unwrap()
            .insert(route, Ok(body.to_string()));
        self
    }

    fn fail(self, route: &'static str, status: u16) -> Self {
        self.bodies.lock().unwrap().insert(route, Err(status));
        self
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<String, ClientError> {
        self.requests.lock().unwrap().push(endpoint.path());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let answer = self
            .bodies
            .lock()
            .unwrap()
            .get(route(endpoint))
            .cloned()
            .unwrap_or(Ok(String::new()));
        answer.map_err(|status| ClientError::Status {
            status,
            path: endpoint.path(),
        })
    }
}

fn session(
    backend: ScriptedBackend,
) -> (
    Session<ScriptedBackend, RegionBoard>,
    mpsc::Receiver<Completion>,
    Arc<ScriptedBackend>,
) {
    let backend = Arc::new(backend);
    let poller = Poller::new(PollerSettings::default(), RegionBoard::new());
    let (session, rx) = Session::new(poller, Arc::clone(&backend));
    (session, rx, backend)
}

async fn settle(
    session: &mut Session<ScriptedBackend, RegionBoard>,
    rx: &mut mpsc::Receiver<Completion>,
) {
    let completion = rx.recv().await.expect("completion");
    session.on_completion(completion);
}

const BAND_SONG: &str = r#"{"streaming":1,"creator":"Band","title":"Song","album":"Record",
"station":"Band+Similar+Artists","duration":200000,"trackprogress":10,"recordtoprofile":"1",
"artistpage":"http://www.last.fm/music/Band"}"#;

#[tokio::test]
async fn streaming_response_renders_track_and_schedules_refresh() {
    let (mut session, mut rx, _backend) = session(ScriptedBackend::default().answer("np", BAND_SONG));

    assert!(session.poll());
    settle(&mut session, &mut rx).await;

    let poller = session.poller();
    assert!(poller.is_streaming());
    assert_eq!(poller.track_duration(), 200);
    assert_eq!(poller.track_progress(), 10);
    // 190 s remain; the countdown is capped
    assert_eq!(poller.refresh_timer(), 15);
    assert!(poller.record_to_profile());

    let board = session.view();
    assert_eq!(board.title, "Band - Song - LastFMProxy");
    assert_eq!(board.text(Region::Artist), "Band");
    assert_eq!(
        board.get(Region::Artist),
        Some(&RegionContent::link("Band", "http://www.last.fm/music/Band"))
    );
    assert_eq!(board.text(Region::Station), "Band Similar Artists");
    assert_eq!(
        board.get(Region::Cover),
        Some(&RegionContent::Image {
            src: DEFAULT_COVER.to_string()
        })
    );
    assert_eq!(board.buttons, Some(ButtonGroup::Streaming));
    assert!(board.record_to_profile);
    assert!(board.text(Region::Debug).starts_with("{\"streaming\""));
}

#[tokio::test]
async fn stopped_response_shows_start_controls() {
    let (mut session, mut rx, _backend) =
        session(ScriptedBackend::default().answer("np", "np_streaming = 0;\n"));

    session.poll();
    settle(&mut session, &mut rx).await;

    let poller = session.poller();
    assert!(!poller.is_streaming());
    assert_eq!(poller.refresh_timer(), 5);
    assert_eq!(poller.track_progress(), 0);
    assert_eq!(poller.track_duration(), 0);

    let board = session.view();
    assert_eq!(board.buttons, Some(ButtonGroup::Start));
    assert_eq!(board.text(Region::Station), START_LABEL);
    assert_eq!(board.get(Region::Artist), Some(&RegionContent::Blank));
    assert_eq!(board.text(Region::Cover), DEFAULT_COVER);
}

#[tokio::test]
async fn overlapping_polls_send_one_request() {
    let gate = Arc::new(Notify::new());
    let (mut session, mut rx, backend) = session(
        ScriptedBackend::default()
            .answer("np", BAND_SONG)
            .gated(Arc::clone(&gate)),
    );

    assert!(session.poll());
    assert!(!session.poll());
    session.perform(&UserAction::Refresh);
    assert_eq!(session.requests_sent(), 1);
    assert!(session.poller().poll_in_flight());

    gate.notify_one();
    settle(&mut session, &mut rx).await;
    assert!(!session.poller().poll_in_flight());
    assert_eq!(backend.requests(), vec!["/np".to_string()]);

    // the guard is released once the response is in
    assert!(session.poll());
    assert_eq!(session.requests_sent(), 2);
}

#[tokio::test]
async fn space_skips_and_shows_placeholder_until_answered() {
    let gate = Arc::new(Notify::new());
    let (mut session, mut rx, backend) = session(
        ScriptedBackend::default()
            .answer("np", BAND_SONG)
            .answer("skip", r#"{"streaming":1,"creator":"Other","title":"Tune","duration":100000}"#)
            .gated(Arc::clone(&gate)),
    );

    gate.notify_one();
    session.poll();
    settle(&mut session, &mut rx).await;

    let action = ShortcutMap::default()
        .resolve(32, Focus::Normal)
        .expect("space is bound");
    session.perform(&action);
    assert_eq!(session.view().text(Region::Station), "Skipping...");
    assert_eq!(session.requests_sent(), 2);

    gate.notify_one();
    settle(&mut session, &mut rx).await;

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].starts_with("/skip?r="));

    // the action response is rendered like a poll
    let board = session.view();
    assert_eq!(board.title, "Other - Tune - LastFMProxy");
    assert_eq!(session.poller().track_duration(), 100);
}

#[tokio::test]
async fn result_message_replaces_station_label() {
    let (mut session, mut rx, backend) = session(
        ScriptedBackend::default()
            .answer("np", BAND_SONG)
            .answer("changestation", "result = 'OK, changing station...';\n"),
    );

    session.poll();
    settle(&mut session, &mut rx).await;

    session.perform(&UserAction::ChangeStation("lastfm://globaltags/jazz".into()));
    assert_eq!(session.view().text(Region::Station), "Changing station...");
    settle(&mut session, &mut rx).await;

    assert_eq!(session.view().text(Region::Station), "OK, changing station...");
    assert_eq!(session.poller().refresh_timer(), 5);
    // the track display stays until the next poll
    assert_eq!(session.view().text(Region::Artist), "Band");
    assert_eq!(
        backend.requests()[1],
        "/changestation/lastfm://globaltags/jazz"
    );
}

#[tokio::test]
async fn toggle_asks_for_the_opposite_state() {
    let (mut session, mut rx, backend) = session(
        ScriptedBackend::default()
            .answer("np", BAND_SONG)
            .answer("rtp", "result = 'Record to profile off';\n"),
    );

    session.poll();
    settle(&mut session, &mut rx).await;
    assert!(session.poller().record_to_profile());

    let programmatic = session.view().programmatic_updates;
    session.perform(&UserAction::ToggleRecordToProfile);
    assert!(!session.view().record_to_profile);
    assert_eq!(session.view().programmatic_updates, programmatic);
    settle(&mut session, &mut rx).await;

    assert_eq!(backend.requests()[1], "/nortp");
}

#[tokio::test]
async fn failed_poll_keeps_display_and_releases_guard() {
    let (mut session, mut rx, _backend) =
        session(ScriptedBackend::default().fail("np", 500));

    session.poll();
    settle(&mut session, &mut rx).await;

    assert!(!session.poller().poll_in_flight());
    assert_eq!(session.view().buttons, None);
    assert_eq!(
        session.view().text(Region::Debug),
        "error: backend answered 500 for /np"
    );
    assert!(session.poll());
}

#[tokio::test]
async fn garbage_body_is_ignored() {
    let (mut session, mut rx, _backend) =
        session(ScriptedBackend::default().answer("np", "alert('pwned');"));

    session.poll();
    settle(&mut session, &mut rx).await;

    assert_eq!(session.view().buttons, None);
    assert_eq!(session.view().text(Region::Debug), "alert('pwned');");
    assert!(!session.poller().poll_in_flight());
}
