//! Display preferences stored with cookie semantics.
//!
//! Each preference is a cookie: a string value under a fixed key, with
//! optional path/domain/expiry/secure attributes. A missing or expired
//! cookie reads back as the key's default. Writing a cookie whose expiry is
//! already in the past deletes it. The jar is persisted as JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::protocol::parse_leading_int;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("preference file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("preference file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// The boolean column toggles of the player UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preference {
    ShowArtist,
    ShowAlbum,
    ShowGenre,
    ShowDuration,
    ShowRating,
}

impl Preference {
    pub const ALL: [Preference; 5] = [
        Preference::ShowArtist,
        Preference::ShowAlbum,
        Preference::ShowGenre,
        Preference::ShowDuration,
        Preference::ShowRating,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Preference::ShowArtist => "eh_pref_playlist_artist",
            Preference::ShowAlbum => "eh_pref_playlist_album",
            Preference::ShowGenre => "eh_pref_playlist_genre",
            Preference::ShowDuration => "eh_pref_playlist_duration",
            Preference::ShowRating => "eh_pref_playlist_rating",
        }
    }

    pub fn default_value(self) -> &'static str {
        match self {
            Preference::ShowArtist | Preference::ShowAlbum | Preference::ShowDuration => "1",
            Preference::ShowGenre | Preference::ShowRating => "0",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Preference::ShowArtist => "artist",
            Preference::ShowAlbum => "album",
            Preference::ShowGenre => "genre",
            Preference::ShowDuration => "duration",
            Preference::ShowRating => "rating",
        }
    }
}

/// Snapshot of all toggles, read once and handed to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiPreferences {
    pub show_artist: bool,
    pub show_album: bool,
    pub show_genre: bool,
    pub show_duration: bool,
    pub show_rating: bool,
}

impl UiPreferences {
    pub fn get(&self, pref: Preference) -> bool {
        match pref {
            Preference::ShowArtist => self.show_artist,
            Preference::ShowAlbum => self.show_album,
            Preference::ShowGenre => self.show_genre,
            Preference::ShowDuration => self.show_duration,
            Preference::ShowRating => self.show_rating,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieAttributes {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    /// `None` is a session cookie: kept until overwritten.
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub secure: bool,
}

impl CookieAttributes {
    /// Path `/`, no expiry.
    pub fn site_wide() -> Self {
        Self {
            path: Some("/".to_string()),
            ..Default::default()
        }
    }

    pub fn expiring_in_days(days: i64, now: DateTime<Utc>) -> Self {
        Self {
            expires: Some(now + Duration::days(days)),
            ..Self::site_wide()
        }
    }

    /// Attributes that delete the cookie when written.
    pub fn expired(now: DateTime<Utc>) -> Self {
        Self {
            expires: Some(now - Duration::days(1)),
            ..Self::site_wide()
        }
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|e| e <= now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    #[serde(flatten)]
    attrs: CookieAttributes,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Jar {
    #[serde(default)]
    cookies: BTreeMap<String, StoredCookie>,
}

pub struct PreferenceStore {
    path: Option<PathBuf>,
    jar: Jar,
}

impl PreferenceStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            jar: Jar::default(),
        }
    }

    /// Open the jar at `path`; a missing file is an empty jar.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let jar = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            Jar::default()
        };
        debug!("loaded {} preference cookies from {}", jar.cookies.len(), path.display());
        Ok(Self {
            path: Some(path),
            jar,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn save(&self) -> Result<(), PrefsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.jar)?)?;
        Ok(())
    }

    pub fn set(&mut self, name: &str, value: &str, attrs: CookieAttributes) -> Result<(), PrefsError> {
        self.set_at(name, value, attrs, Utc::now())
    }

    pub fn set_at(
        &mut self,
        name: &str,
        value: &str,
        attrs: CookieAttributes,
        now: DateTime<Utc>,
    ) -> Result<(), PrefsError> {
        if attrs.is_expired_at(now) {
            self.jar.cookies.remove(name);
        } else {
            self.jar.cookies.insert(
                name.to_string(),
                StoredCookie {
                    value: value.to_string(),
                    attrs,
                },
            );
        }
        self.save()
    }

    pub fn get(&self, name: &str, default: &str) -> String {
        self.get_at(name, default, Utc::now())
    }

    pub fn get_at(&self, name: &str, default: &str, now: DateTime<Utc>) -> String {
        match self.jar.cookies.get(name) {
            Some(c) if !c.attrs.is_expired_at(now) => c.value.clone(),
            _ => default.to_string(),
        }
    }

    /// Overwrite with an expiry in the past.
    pub fn remove(&mut self, name: &str) -> Result<(), PrefsError> {
        let now = Utc::now();
        self.set_at(name, "", CookieAttributes::expired(now), now)
    }

    pub fn get_bool(&self, pref: Preference) -> bool {
        let raw = self.get(pref.key(), pref.default_value());
        parse_leading_int(&raw).is_some_and(|v| v != 0)
    }

    pub fn set_bool(&mut self, pref: Preference, value: bool) -> Result<(), PrefsError> {
        self.set(pref.key(), if value { "1" } else { "0" }, CookieAttributes::site_wide())
    }

    /// Flip a toggle and return its new value.
    pub fn toggle(&mut self, pref: Preference) -> Result<bool, PrefsError> {
        let next = !self.get_bool(pref);
        self.set_bool(pref, next)?;
        Ok(next)
    }

    pub fn ui_preferences(&self) -> UiPreferences {
        UiPreferences {
            show_artist: self.get_bool(Preference::ShowArtist),
            show_album: self.get_bool(Preference::ShowAlbum),
            show_genre: self.get_bool(Preference::ShowGenre),
            show_duration: self.get_bool(Preference::ShowDuration),
            show_rating: self.get_bool(Preference::ShowRating),
        }
    }

    /// `Set-Cookie`-style line for one stored cookie.
    pub fn set_cookie_string(&self, name: &str) -> Option<String> {
        let c = self.jar.cookies.get(name)?;
        let mut out = format!("{}={}", name, urlencoding::encode(&c.value));
        if let Some(expires) = c.attrs.expires {
            out.push_str(&format!(";expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT")));
        }
        if let Some(path) = &c.attrs.path {
            out.push_str(&format!(";path={}", path));
        }
        if let Some(domain) = &c.attrs.domain {
            out.push_str(&format!(";domain={}", domain));
        }
        if c.attrs.secure {
            out.push_str(";secure");
        }
        Some(out)
    }

    /// `Cookie` header carrying every live cookie.
    pub fn cookie_header_at(&self, now: DateTime<Utc>) -> String {
        self.jar
            .cookies
            .iter()
            .filter(|(_, c)| !c.attrs.is_expired_at(now))
            .map(|(name, c)| format!("{}={}", name, urlencoding::encode(&c.value)))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Split a `Cookie` header into unescaped name/value pairs.
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = urlencoding::decode(value.trim())
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.trim().to_string());
            Some((name.to_string(), value))
        })
        .collect()
}
