//! Wire contract of the LastFMProxy HTTP endpoints.
//!
//! `/np` and every action endpoint answer with a status-update payload. Two
//! encodings are accepted:
//!
//! - the legacy assignment script the proxy emits (`np_creator = 'Band';`),
//!   which is parsed declaratively and never executed;
//! - a JSON object carrying the same fields.
//!
//! Both fail closed: anything that does not match the expected shape is a
//! [`PayloadError`] and the caller keeps its previous state.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::StatusUpdate;

pub const NOW_PLAYING_PATH: &str = "/np";

/// Upper bound on list lengths, indices and counts in a script payload.
pub const MAX_LIST_ITEMS: usize = 1024;

/// Every backend endpoint the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    NowPlaying,
    /// The nonce is a cache buster appended as `?r=`.
    Skip { nonce: u32 },
    Love,
    Ban,
    ChangeStation(String),
    RecordToProfile(bool),
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Endpoint::NowPlaying => NOW_PLAYING_PATH.to_string(),
            Endpoint::Skip { nonce } => format!("/skip?r={}", nonce),
            Endpoint::Love => "/love".to_string(),
            Endpoint::Ban => "/ban".to_string(),
            Endpoint::ChangeStation(id) => format!("/changestation/{}", id),
            Endpoint::RecordToProfile(true) => "/rtp".to_string(),
            Endpoint::RecordToProfile(false) => "/nortp".to_string(),
        }
    }

    pub fn is_poll(&self) -> bool {
        matches!(self, Endpoint::NowPlaying)
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("unexpected value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Raw `/np` fields, named after the proxy's `np_*` variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingPayload {
    /// Only `0` and `1` are meaningful; anything else rejects the payload.
    #[serde(default, deserialize_with = "de_streaming")]
    pub streaming: bool,
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "artistPage")]
    pub artistpage: Option<String>,
    #[serde(default, alias = "albumPage")]
    pub albumpage: Option<String>,
    #[serde(default, alias = "trackPage")]
    pub trackpage: Option<String>,
    /// Track length in milliseconds.
    #[serde(default, alias = "trackDuration", deserialize_with = "de_int")]
    pub duration: Option<i64>,
    /// Seconds since the proxy started the track.
    #[serde(default, alias = "trackProgress", deserialize_with = "de_int")]
    pub trackprogress: Option<i64>,
    #[serde(default, alias = "metadataAge", deserialize_with = "de_int")]
    pub metadata_age: Option<i64>,
    #[serde(default, alias = "recordToProfile", deserialize_with = "de_flag")]
    pub recordtoprofile: bool,
    #[serde(default, alias = "lastTracks")]
    pub lasttracks: Option<Vec<String>>,
    #[serde(default)]
    pub bookmarks: Option<Vec<String>>,
    #[serde(default)]
    pub result: Option<String>,
}

/// Decode a response body into a status update, picking the encoding from
/// its first non-blank character.
pub fn decode_status(body: &str) -> Result<StatusUpdate, PayloadError> {
    let payload = if body.trim_start().starts_with('{') {
        serde_json::from_str::<NowPlayingPayload>(body)?
    } else {
        parse_script(body)?
    };
    Ok(StatusUpdate::from_payload(payload))
}

// ── Lenient scalar handling ──────────────────────────────────────────────────

/// A JSON scalar before it is coerced to the field's type.
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    match Option::<Loose>::deserialize(d)? {
        None => Ok(false),
        Some(Loose::Bool(b)) => Ok(b),
        Some(Loose::Int(i)) => Ok(i != 0),
        Some(Loose::Float(f)) => Ok(f != 0.0),
        Some(Loose::Str(s)) => {
            parse_flag(&s).ok_or_else(|| de::Error::custom(format!("not a flag: {:?}", s)))
        }
    }
}

fn de_streaming<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let raw = match Option::<Loose>::deserialize(d)? {
        None => return Ok(false),
        Some(Loose::Bool(b)) => return Ok(b),
        Some(Loose::Int(i)) => Some(i),
        Some(Loose::Str(s)) => parse_leading_int(&s),
        Some(Loose::Float(_)) => None,
    };
    raw.and_then(streaming_flag)
        .ok_or_else(|| de::Error::custom("streaming must be 0 or 1"))
}

fn streaming_flag(raw: i64) -> Option<bool> {
    match raw {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

fn de_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match Option::<Loose>::deserialize(d)? {
        None => Ok(None),
        Some(Loose::Int(i)) => Ok(Some(i)),
        Some(Loose::Float(f)) if f.is_finite() => Ok(Some(f.trunc() as i64)),
        Some(Loose::Str(s)) => parse_leading_int(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("not an integer: {:?}", s))),
        Some(_) => Err(de::Error::custom("expected an integer")),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "True" => Some(true),
        "false" | "False" | "" => Some(false),
        other => parse_leading_int(other).map(|i| i != 0),
    }
}

/// Integer prefix of `s`: optional sign followed by at least one digit.
/// `"10"`, `" 10"` and `"10s"` all give 10.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (neg, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: &str = &rest[..rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len())];
    if digits.is_empty() {
        return None;
    }
    let n: i64 = digits.parse().ok()?;
    Some(if neg { -n } else { n })
}

// ── Legacy assignment script ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum ScriptValue {
    Str(String),
    Int(i64),
    Array(usize),
}

impl ScriptValue {
    fn describe(&self) -> String {
        match self {
            ScriptValue::Str(s) => format!("{:?}", s),
            ScriptValue::Int(i) => i.to_string(),
            ScriptValue::Array(n) => format!("new Array({})", n),
        }
    }
}

struct Statement {
    name: String,
    index: Option<usize>,
    value: ScriptValue,
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> PayloadError {
        PayloadError::Syntax {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, want: char) -> Result<(), PayloadError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", want, c))),
            None => Err(self.error(format!("expected '{}', found end of input", want))),
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.rest().starts_with(kw) {
            self.pos += kw.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String, PayloadError> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(self.error("expected identifier")),
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn integer(&mut self) -> Result<i64, PayloadError> {
        self.skip_ws();
        let start = self.pos;
        if matches!(self.peek(), Some('-')) {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        self.src[start..self.pos]
            .parse()
            .map_err(|_| self.error("expected integer"))
    }

    fn quoted(&mut self) -> Result<String, PayloadError> {
        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected string literal")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn value(&mut self) -> Result<ScriptValue, PayloadError> {
        self.skip_ws();
        match self.peek() {
            Some('\'' | '"') => self.quoted().map(ScriptValue::Str),
            Some(c) if c.is_ascii_digit() || c == '-' => self.integer().map(ScriptValue::Int),
            Some('n') => {
                if !self.eat_keyword("new") {
                    return Err(self.error("expected string, integer or array"));
                }
                self.skip_ws();
                if !self.eat_keyword("Array") {
                    return Err(self.error("only `new Array(n)` is allowed"));
                }
                self.expect('(')?;
                let len = self.integer()?;
                self.expect(')')?;
                usize::try_from(len)
                    .map(ScriptValue::Array)
                    .map_err(|_| self.error("negative array length"))
            }
            _ => Err(self.error("expected string, integer or array")),
        }
    }

    fn statement(&mut self) -> Result<Option<Statement>, PayloadError> {
        self.skip_ws();
        if self.peek().is_none() {
            return Ok(None);
        }
        let name = self.ident()?;
        self.skip_ws();
        let index = if matches!(self.peek(), Some('[')) {
            self.bump();
            let idx = self.integer()?;
            self.expect(']')?;
            Some(usize::try_from(idx).map_err(|_| self.error("negative index"))?)
        } else {
            None
        };
        self.expect('=')?;
        let value = self.value()?;
        self.expect(';')?;
        Ok(Some(Statement { name, index, value }))
    }
}

fn str_value(name: &str, value: ScriptValue) -> Result<String, PayloadError> {
    match value {
        ScriptValue::Str(s) => Ok(s),
        ScriptValue::Int(i) => Ok(i.to_string()),
        other => Err(PayloadError::InvalidValue {
            name: name.to_string(),
            value: other.describe(),
        }),
    }
}

fn int_value(name: &str, value: ScriptValue) -> Result<i64, PayloadError> {
    let invalid = |v: &ScriptValue| PayloadError::InvalidValue {
        name: name.to_string(),
        value: v.describe(),
    };
    match value {
        ScriptValue::Int(i) => Ok(i),
        ScriptValue::Str(ref s) => parse_leading_int(s).ok_or_else(|| invalid(&value)),
        ref other => Err(invalid(other)),
    }
}

fn check_list_bound(name: &str, n: usize) -> Result<(), PayloadError> {
    if n > MAX_LIST_ITEMS {
        return Err(PayloadError::InvalidValue {
            name: name.to_string(),
            value: n.to_string(),
        });
    }
    Ok(())
}

/// Length announced by `np_xs = n;`; negative counts mean none.
fn list_count(name: &str, value: ScriptValue) -> Result<usize, PayloadError> {
    let n = usize::try_from(int_value(name, value)?.max(0)).unwrap_or(usize::MAX);
    check_list_bound(name, n)?;
    Ok(n)
}

/// Collects one `np_x = new Array(n); np_x[i] = '...';` list and its
/// separate `np_xs = n;` count.
#[derive(Default)]
struct ListSlot {
    count: usize,
    items: Vec<String>,
}

impl ListSlot {
    fn assign(&mut self, name: &str, index: Option<usize>, value: ScriptValue) -> Result<(), PayloadError> {
        match (index, value) {
            (None, ScriptValue::Array(n)) => {
                check_list_bound(name, n)?;
                self.items = vec![String::new(); n];
                Ok(())
            }
            (Some(i), value) => {
                check_list_bound(name, i.saturating_add(1))?;
                let s = str_value(name, value)?;
                if i >= self.items.len() {
                    self.items.resize(i + 1, String::new());
                }
                self.items[i] = s;
                Ok(())
            }
            (None, other) => Err(PayloadError::InvalidValue {
                name: name.to_string(),
                value: other.describe(),
            }),
        }
    }

    /// A zero count means the list was not sent.
    fn finish(mut self) -> Option<Vec<String>> {
        if self.count == 0 {
            return None;
        }
        self.items.resize(self.count, String::new());
        Some(self.items)
    }
}

/// Parse the proxy's assignment-script payload.
pub fn parse_script(src: &str) -> Result<NowPlayingPayload, PayloadError> {
    let mut cursor = Cursor::new(src);
    let mut payload = NowPlayingPayload::default();
    let mut lasttracks = ListSlot::default();
    let mut bookmarks = ListSlot::default();

    while let Some(Statement { name, index, value }) = cursor.statement()? {
        if index.is_some() && !matches!(name.as_str(), "np_lasttrack" | "np_bookmark") {
            return Err(PayloadError::InvalidValue {
                value: format!("{}[..]", name),
                name,
            });
        }
        match name.as_str() {
            "np_streaming" => {
                let raw = int_value(&name, value)?;
                payload.streaming = streaming_flag(raw).ok_or_else(|| PayloadError::InvalidValue {
                    name: name.clone(),
                    value: raw.to_string(),
                })?;
            }
            "np_station" => payload.station = Some(str_value(&name, value)?),
            "np_creator" => payload.creator = Some(str_value(&name, value)?),
            "np_title" => payload.title = Some(str_value(&name, value)?),
            "np_album" => payload.album = Some(str_value(&name, value)?),
            "np_image" => payload.image = Some(str_value(&name, value)?),
            "np_artistpage" => payload.artistpage = Some(str_value(&name, value)?),
            "np_albumpage" => payload.albumpage = Some(str_value(&name, value)?),
            "np_trackpage" => payload.trackpage = Some(str_value(&name, value)?),
            "np_duration" => payload.duration = Some(int_value(&name, value)?),
            "np_trackprogress" => payload.trackprogress = Some(int_value(&name, value)?),
            "np_metadata_age" => payload.metadata_age = Some(int_value(&name, value)?),
            "np_recordtoprofile" => payload.recordtoprofile = int_value(&name, value)? != 0,
            "np_lasttracks" => lasttracks.count = list_count(&name, value)?,
            "np_bookmarks" => bookmarks.count = list_count(&name, value)?,
            "np_lasttrack" => lasttracks.assign(&name, index, value)?,
            "np_bookmark" => bookmarks.assign(&name, index, value)?,
            "result" => payload.result = Some(str_value(&name, value)?),
            // Remaining XSPF track fields (location, id, trackauth, ...) are not displayed.
            other => tracing::trace!("ignoring payload field {}", other),
        }
    }

    payload.lasttracks = lasttracks.finish();
    payload.bookmarks = bookmarks.finish();
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAMING: &str = "np_streaming = 1;\n\
np_station = 'Radiohead+Similar+Artists';\n\
np_location = 'http://play.last.fm/user/abc.mp3';\n\
np_title = 'Karma Police';\n\
np_creator = 'Radiohead';\n\
np_album = 'OK Computer';\n\
np_duration = '264000';\n\
np_image = 'http://img/ok.jpg';\n\
np_artistpage = 'http://www.last.fm/music/Radiohead';\n\
np_trackpage = 'http://www.last.fm/music/Radiohead/_/Karma+Police';\n\
np_trackprogress = 42;\n\
np_recordtoprofile = 1;\n\
np_lasttracks = 2;\n\
np_lasttrack = new Array(2);\n\
np_lasttrack[0] = '<a href=\"http://t/1\">A - B</a>';\n\
np_lasttrack[1] = 'It\\'s - C';\n\
np_bookmarks = 1;\n\
np_bookmark = new Array(1);\n\
np_bookmark[0] = 'lastfm://globaltags/jazz';\n";

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::NowPlaying.path(), "/np");
        assert_eq!(Endpoint::Skip { nonce: 7 }.path(), "/skip?r=7");
        assert_eq!(Endpoint::Love.path(), "/love");
        assert_eq!(Endpoint::Ban.path(), "/ban");
        assert_eq!(
            Endpoint::ChangeStation("lastfm://user/rj/loved".into()).path(),
            "/changestation/lastfm://user/rj/loved"
        );
        assert_eq!(Endpoint::RecordToProfile(true).path(), "/rtp");
        assert_eq!(Endpoint::RecordToProfile(false).path(), "/nortp");
        assert!(Endpoint::NowPlaying.is_poll());
        assert!(!Endpoint::Love.is_poll());
    }

    #[test]
    fn parses_streaming_script() {
        let p = parse_script(STREAMING).unwrap();
        assert!(p.streaming);
        assert_eq!(p.creator.as_deref(), Some("Radiohead"));
        assert_eq!(p.title.as_deref(), Some("Karma Police"));
        assert_eq!(p.duration, Some(264000));
        assert_eq!(p.trackprogress, Some(42));
        assert_eq!(p.metadata_age, None);
        assert!(p.recordtoprofile);
        let tracks = p.lasttracks.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1], "It's - C");
        assert_eq!(p.bookmarks.unwrap(), vec!["lastfm://globaltags/jazz"]);
    }

    #[test]
    fn zero_counts_mean_lists_absent() {
        let p = parse_script(
            "np_streaming = 0;\nnp_recordtoprofile = 1;\nnp_lasttracks = 0;\nnp_lasttrack = new Array(0);\nnp_bookmarks = 0;\nnp_bookmark = new Array(0);\n",
        )
        .unwrap();
        assert!(!p.streaming);
        assert!(p.lasttracks.is_none());
        assert!(p.bookmarks.is_none());
    }

    #[test]
    fn result_only_payload() {
        let p = parse_script("result = 'OK, changing station...';\n").unwrap();
        assert_eq!(p.result.as_deref(), Some("OK, changing station..."));
        assert!(!p.streaming);
    }

    #[test]
    fn rejects_code() {
        assert!(parse_script("alert('x');").is_err());
        assert!(parse_script("np_title = document.cookie;").is_err());
        assert!(parse_script("np_title = 'unterminated;").is_err());
        assert!(parse_script("np_title = 'x'").is_err());
        assert!(parse_script("np_title[0] = 'x';").is_err());
        assert!(parse_script("np_duration = 'abc';").is_err());
    }

    #[test]
    fn empty_body_is_not_streaming() {
        let p = parse_script("").unwrap();
        assert_eq!(p, NowPlayingPayload::default());
    }

    #[test]
    fn json_accepts_loose_scalars() {
        let update = decode_status(
            r#"{"streaming":1,"creator":"Band","title":"Song","trackDuration":200000,"trackProgress":"10","metadataAge":0}"#,
        )
        .unwrap();
        let p = &update.playback;
        assert!(p.is_streaming);
        assert_eq!(p.track_duration_millis, 200000);
        assert_eq!(p.reported_progress_secs, 10);
        assert_eq!(p.metadata_age_secs, 0);
    }

    #[test]
    fn json_rejects_wrong_shapes() {
        assert!(decode_status(r#"{"streaming":"maybe"}"#).is_err());
        assert!(decode_status(r#"{"duration":[1]}"#).is_err());
        assert!(decode_status(r#"{"creator":"#).is_err());
    }

    #[test]
    fn oversized_lists_are_rejected() {
        for body in [
            "np_lasttrack = new Array(1000000000000000);",
            "np_bookmark[1000000000000000] = 'lastfm://globaltags/jazz';",
            "np_bookmarks = 1000000000000000;",
            "np_lasttracks = 1025;",
        ] {
            assert!(
                matches!(decode_status(body), Err(PayloadError::InvalidValue { .. })),
                "{}",
                body
            );
        }
        let p = parse_script("np_lasttracks = 1024;\nnp_lasttrack = new Array(1024);\n").unwrap();
        assert_eq!(p.lasttracks.map(|t| t.len()), Some(MAX_LIST_ITEMS));
    }

    #[test]
    fn streaming_flag_is_zero_or_one() {
        assert!(parse_script("np_streaming = 1;").unwrap().streaming);
        assert!(!parse_script("np_streaming = '0';").unwrap().streaming);
        assert!(parse_script("np_streaming = 2;").is_err());
        assert!(parse_script("np_streaming = -1;").is_err());
        assert!(decode_status(r#"{"streaming":2}"#).is_err());
        assert!(decode_status(r#"{"streaming":true}"#).unwrap().playback.is_streaming);
    }

    #[test]
    fn leading_int() {
        assert_eq!(parse_leading_int("10"), Some(10));
        assert_eq!(parse_leading_int(" 10s"), Some(10));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("x1"), None);
        assert_eq!(parse_leading_int(""), None);
    }
}
