//! Playback status model built from a decoded payload.

use crate::protocol::NowPlayingPayload;
use crate::station::{station_display_name, Bookmark};

/// Everything one poll (or action) response tells us. Replaced wholesale on
/// every response; nothing here is persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackStatus {
    pub is_streaming: bool,
    pub creator: String,
    pub album: String,
    pub title: String,
    pub artist_page: String,
    pub album_page: String,
    pub track_page: String,
    pub cover_image: Option<String>,
    pub station_label: String,
    /// Seconds into the track when the proxy answered.
    pub reported_progress_secs: i64,
    pub track_duration_millis: i64,
    /// How stale the reported progress already was.
    pub metadata_age_secs: i64,
    pub record_to_profile: bool,
}

impl PlaybackStatus {
    pub fn track_duration_secs(&self) -> i64 {
        (self.track_duration_millis / 1000).max(0)
    }

    /// Progress adjusted for metadata age, never negative.
    pub fn track_progress_secs(&self) -> i64 {
        self.metadata_age_secs
            .saturating_add(self.reported_progress_secs)
            .max(0)
    }
}

/// A decoded response: the playback snapshot plus the optional
/// whole-list replacements and the free-text `result` override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub result: Option<String>,
    pub playback: PlaybackStatus,
    pub recent_tracks: Option<Vec<String>>,
    pub bookmarks: Option<Vec<Bookmark>>,
}

impl StatusUpdate {
    pub fn from_payload(p: NowPlayingPayload) -> Self {
        let playback = PlaybackStatus {
            is_streaming: p.streaming,
            creator: p.creator.unwrap_or_default(),
            album: p.album.unwrap_or_default(),
            title: p.title.unwrap_or_default(),
            artist_page: p.artistpage.unwrap_or_default(),
            album_page: p.albumpage.unwrap_or_default(),
            track_page: p.trackpage.unwrap_or_default(),
            cover_image: p.image.filter(|s| !s.is_empty()),
            station_label: p
                .station
                .as_deref()
                .map(station_display_name)
                .unwrap_or_default(),
            reported_progress_secs: p.trackprogress.unwrap_or(0),
            track_duration_millis: p.duration.unwrap_or(0),
            metadata_age_secs: p.metadata_age.unwrap_or(0),
            record_to_profile: p.recordtoprofile,
        };

        Self {
            result: p.result.filter(|s| !s.is_empty()),
            playback,
            recent_tracks: p.lasttracks,
            bookmarks: p
                .bookmarks
                .map(|urls| urls.into_iter().map(Bookmark::new).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_times() {
        let status = PlaybackStatus {
            reported_progress_secs: 10,
            metadata_age_secs: 2,
            track_duration_millis: 200_500,
            ..Default::default()
        };
        assert_eq!(status.track_progress_secs(), 12);
        assert_eq!(status.track_duration_secs(), 200);
    }

    #[test]
    fn negative_progress_floors_at_zero() {
        let status = PlaybackStatus {
            reported_progress_secs: 0,
            metadata_age_secs: -1,
            ..Default::default()
        };
        assert_eq!(status.track_progress_secs(), 0);
    }

    #[test]
    fn extreme_progress_saturates() {
        let status = PlaybackStatus {
            reported_progress_secs: i64::MAX,
            metadata_age_secs: 5,
            ..Default::default()
        };
        assert_eq!(status.track_progress_secs(), i64::MAX);

        let update = crate::protocol::decode_status(
            "np_streaming = 1;\nnp_trackprogress = 9223372036854775807;\nnp_metadata_age = 5;\n",
        )
        .unwrap();
        assert_eq!(update.playback.track_progress_secs(), i64::MAX);
    }

    #[test]
    fn from_payload_maps_fields() {
        let update = StatusUpdate::from_payload(NowPlayingPayload {
            streaming: true,
            station: Some("Jazz+Tag+Radio".into()),
            creator: Some("Band".into()),
            image: Some(String::new()),
            result: Some(String::new()),
            bookmarks: Some(vec!["lastfm://globaltags/jazz".into()]),
            ..Default::default()
        });
        assert!(update.playback.is_streaming);
        assert_eq!(update.playback.station_label, "Jazz Tag Radio");
        assert_eq!(update.playback.cover_image, None);
        assert_eq!(update.result, None);
        assert_eq!(update.bookmarks.unwrap()[0].label, "jazz");
        assert!(update.recent_tracks.is_none());
    }
}
