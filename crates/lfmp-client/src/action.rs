//! User actions sent to the backend.

use lfmp_proto::protocol::Endpoint;

/// Everything the user can ask the backend to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Skip,
    Love,
    Ban,
    ChangeStation(String),
    /// Flip record-to-profile (scrobbling) relative to the last known state.
    ToggleRecordToProfile,
    /// Manual now-playing refresh; goes through the poll guard.
    Refresh,
}

impl UserAction {
    /// Placeholder shown in the station region until the response lands.
    pub fn pending_label(&self) -> Option<&'static str> {
        match self {
            UserAction::Skip => Some("Skipping..."),
            UserAction::Love => Some("Loving..."),
            UserAction::Ban => Some("Banning..."),
            UserAction::ChangeStation(_) => Some("Changing station..."),
            UserAction::ToggleRecordToProfile => Some("Toggling Record to profile..."),
            UserAction::Refresh => None,
        }
    }

    /// Endpoint for a one-shot action. `record_to_profile` is the current
    /// state, so the toggle asks for its opposite.
    pub fn endpoint(&self, record_to_profile: bool) -> Endpoint {
        match self {
            UserAction::Skip => Endpoint::Skip {
                nonce: rand::random(),
            },
            UserAction::Love => Endpoint::Love,
            UserAction::Ban => Endpoint::Ban,
            UserAction::ChangeStation(id) => Endpoint::ChangeStation(id.clone()),
            UserAction::ToggleRecordToProfile => Endpoint::RecordToProfile(!record_to_profile),
            UserAction::Refresh => Endpoint::NowPlaying,
        }
    }
}
