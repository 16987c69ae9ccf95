//! Track progress line under the now-playing panel.

use ratatui::{layout::Rect, style::Style, text::Span, widgets::LineGauge, Frame};

use crate::theme::{self, LASTFM_RED, RULE};

/// Fraction of the track played; 0 while the duration is unknown.
pub fn played_ratio(elapsed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (elapsed as f64 / total as f64).clamp(0.0, 1.0)
}

/// `label` is the `M:SS / M:SS` clock text shown left of the gauge.
pub fn draw_progress(frame: &mut Frame, area: Rect, elapsed: i64, total: i64, label: &str) {
    if area.height == 0 {
        return;
    }
    let gauge = LineGauge::default()
        .ratio(played_ratio(elapsed, total))
        .label(Span::styled(format!(" {:>13} ", label), theme::label()))
        .filled_style(Style::default().fg(LASTFM_RED))
        .unfilled_style(Style::default().fg(RULE));
    frame.render_widget(gauge, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_clamped() {
        assert_eq!(played_ratio(50, 200), 0.25);
        assert_eq!(played_ratio(300, 200), 1.0);
        assert_eq!(played_ratio(-3, 200), 0.0);
        assert_eq!(played_ratio(12, 0), 0.0);
    }
}
