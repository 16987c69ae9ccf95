//! `M:SS` clock formatting for the elapsed/total display.

/// Format whole seconds as `M:SS` (minutes unpadded, seconds zero-padded).
pub fn fmt_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// The `elapsed / total` string shown in the duration region.
pub fn fmt_progress(elapsed: u64, total: u64) -> String {
    format!("{} / {}", fmt_clock(elapsed), fmt_clock(total))
}
