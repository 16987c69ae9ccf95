//! Shared types for the lfmp client: the now-playing wire contract, the
//! playback status model, preference storage, config and platform paths.

pub mod clock;
pub mod config;
pub mod platform;
pub mod prefs;
pub mod protocol;
pub mod station;
pub mod status;
