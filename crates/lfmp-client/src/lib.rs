//! Now-playing client for a LastFMProxy backend: the poller state machine,
//! its region binding layer, the HTTP backend and keyboard shortcuts.

pub mod action;
pub mod backend;
pub mod error;
pub mod keys;
pub mod poller;
pub mod session;
pub mod view;
