//! Station names, bookmark labels and derived `lastfm://` station URLs.

use serde::{Deserialize, Serialize};

const SCHEME: &str = "lastfm://";
const MAX_LABEL_CHARS: usize = 30;
const TRUNCATED_LABEL_CHARS: usize = 27;

/// A saved station as offered in the station selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Value sent to `/changestation/<url>`.
    pub url: String,
    pub label: String,
}

impl Bookmark {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let label = bookmark_label(&url);
        Self { url, label }
    }
}

fn percent_decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Short selector label for a bookmarked station URL:
/// `lastfm://globaltags/jazz` becomes `jazz`.
pub fn bookmark_label(url: &str) -> String {
    let decoded = percent_decode(url);
    let mut label = decoded.strip_prefix(SCHEME).unwrap_or(&decoded);
    label = label.strip_prefix("globaltags/").unwrap_or(label);
    label = label.strip_prefix("user/").unwrap_or(label);

    if label.chars().count() > MAX_LABEL_CHARS {
        let head: String = label.chars().take(TRUNCATED_LABEL_CHARS).collect();
        format!("{}...", head)
    } else {
        label.to_string()
    }
}

/// Human-readable station title from the proxy's form-encoded `np_station`.
pub fn station_display_name(raw: &str) -> String {
    percent_decode(&raw.replace('+', " "))
}

/// `lastfm://artist/<creator>/similarartists`
pub fn similar_artists_station(creator: &str) -> String {
    format!("{}artist/{}/similarartists", SCHEME, urlencoding::encode(creator))
}

/// `lastfm://artist/<creator>/fans`
pub fn fans_station(creator: &str) -> String {
    format!("{}artist/{}/fans", SCHEME, urlencoding::encode(creator))
}

/// Prefix bare station paths with the `lastfm://` scheme.
pub fn normalize_station_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{}{}", SCHEME, trimmed)
    }
}
