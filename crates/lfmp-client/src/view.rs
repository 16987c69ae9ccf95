//! Region binding layer.
//!
//! The poller never draws anything itself: it writes to named regions
//! through the [`View`] trait. Region identifiers are a fixed contract with
//! the front-end (`lfmp-dyn-artist`, `debug`, ...). A view that does not
//! bind a region reports it and the poller notes the miss in `debug`.

use std::collections::HashMap;

use lfmp_proto::station::Bookmark;

pub const DEFAULT_COVER: &str = "data/noalbum_medium.gif";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Artist,
    Album,
    Track,
    Cover,
    Duration,
    Station,
    SimilarLink,
    FansLink,
    RecentTracks,
    Debug,
}

impl Region {
    pub const ALL: [Region; 10] = [
        Region::Artist,
        Region::Album,
        Region::Track,
        Region::Cover,
        Region::Duration,
        Region::Station,
        Region::SimilarLink,
        Region::FansLink,
        Region::RecentTracks,
        Region::Debug,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Region::Artist => "lfmp-dyn-artist",
            Region::Album => "lfmp-dyn-album",
            Region::Track => "lfmp-dyn-track",
            Region::Cover => "lfmp-dyn-cover",
            Region::Duration => "lfmp-dyn-dur",
            Region::Station => "lfmp-dyn-station",
            Region::SimilarLink => "lfmp-dyn-similarlink",
            Region::FansLink => "lfmp-dyn-fanslink",
            Region::RecentTracks => "lfmp-dyn-lasttracks-list",
            Region::Debug => "debug",
        }
    }

    pub fn from_id(id: &str) -> Option<Region> {
        Region::ALL.into_iter().find(|r| r.id() == id)
    }
}

/// What a region shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionContent {
    /// Placeholder that keeps the region's height.
    Blank,
    Text(String),
    Link { text: String, href: String },
    /// A link that switches to another station when followed.
    StationLink { text: String, station: String },
    Image { src: String },
}

impl RegionContent {
    pub fn text(s: impl Into<String>) -> Self {
        RegionContent::Text(s.into())
    }

    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        RegionContent::Link {
            text: text.into(),
            href: href.into(),
        }
    }

    /// The visible text, without link targets.
    pub fn display(&self) -> &str {
        match self {
            RegionContent::Blank => "",
            RegionContent::Text(s) => s,
            RegionContent::Link { text, .. } | RegionContent::StationLink { text, .. } => text,
            RegionContent::Image { src } => src,
        }
    }
}

/// Which action-button group is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonGroup {
    /// `lfmp-buttons1`: skip / love / ban.
    Streaming,
    /// `lfmp-buttons2`: start radio.
    Start,
}

impl ButtonGroup {
    pub fn id(self) -> &'static str {
        match self {
            ButtonGroup::Streaming => "lfmp-buttons1",
            ButtonGroup::Start => "lfmp-buttons2",
        }
    }
}

/// Who is changing a control. Programmatic updates mirror backend state
/// and must never be fed back as user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    Programmatic,
    User,
}

pub trait View {
    /// Returns `false` when the view has no such region.
    fn set_region(&mut self, region: Region, content: RegionContent) -> bool;
    fn set_title(&mut self, title: &str);
    fn show_buttons(&mut self, group: ButtonGroup);
    fn set_record_to_profile(&mut self, checked: bool, origin: UpdateOrigin);
    fn replace_recent_tracks(&mut self, tracks: &[String]);
    fn replace_bookmarks(&mut self, bookmarks: &[Bookmark], origin: UpdateOrigin);
}

/// In-memory view binding every region. The terminal front-end draws from
/// it; tests inspect it.
#[derive(Debug, Clone, Default)]
pub struct RegionBoard {
    regions: HashMap<Region, RegionContent>,
    pub title: String,
    pub buttons: Option<ButtonGroup>,
    pub record_to_profile: bool,
    pub recent_tracks: Vec<String>,
    pub bookmarks: Vec<Bookmark>,
    /// Count of programmatic checkbox/selector writes, for diagnostics.
    pub programmatic_updates: usize,
}

impl RegionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, region: Region) -> Option<&RegionContent> {
        self.regions.get(&region)
    }

    /// Visible text of a region, empty when never written.
    pub fn text(&self, region: Region) -> &str {
        self.regions.get(&region).map(|c| c.display()).unwrap_or("")
    }
}

impl View for RegionBoard {
    fn set_region(&mut self, region: Region, content: RegionContent) -> bool {
        self.regions.insert(region, content);
        true
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn show_buttons(&mut self, group: ButtonGroup) {
        self.buttons = Some(group);
    }

    fn set_record_to_profile(&mut self, checked: bool, origin: UpdateOrigin) {
        if origin == UpdateOrigin::Programmatic {
            self.programmatic_updates += 1;
        }
        self.record_to_profile = checked;
    }

    fn replace_recent_tracks(&mut self, tracks: &[String]) {
        self.recent_tracks = tracks.iter().map(|t| strip_markup(t)).collect();
    }

    fn replace_bookmarks(&mut self, bookmarks: &[Bookmark], origin: UpdateOrigin) {
        if origin == UpdateOrigin::Programmatic {
            self.programmatic_updates += 1;
        }
        self.bookmarks = bookmarks.to_vec();
    }
}

/// Drop `<...>` tags and decode the few entities the proxy emits.
pub fn strip_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", " ")
}
