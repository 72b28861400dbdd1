//! Panel controller: the loop panel's view model and its input vocabulary.
//!
//! Rendering is one-way: [`PanelController::view`] derives a [`PanelView`]
//! from the region and the host draws it. User edits come back as
//! [`PanelInput`]s; the helpers here turn them into the time the model
//! should be set to, or reject them.

use crate::config::Preset;
use crate::region::LoopRegion;
use crate::timefmt::{format_time, parse_time_input};

/// Everything the host needs to draw the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub enabled: bool,
    pub collapsed: bool,
    pub start_text: String,
    pub end_text: String,
    pub length_text: String,
    pub duration_text: String,
    /// Handle positions along the track, in percent.
    pub start_pct: f64,
    pub end_pct: f64,
    pub playhead_pct: f64,
    pub presets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Back,
    Forward,
}

/// A user edit coming from the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelInput {
    Toggle,
    /// Committed text of the start field.
    StartText(String),
    EndText(String),
    /// Set the bound to the current playback position.
    SetStartHere,
    SetEndHere,
    NudgeStart(Nudge),
    NudgeEnd(Nudge),
    /// Handle dragged to a fraction of the track (`0.0..=1.0`).
    DragStart(f64),
    DragEnd(f64),
    /// Click on the bare track; moves the nearer handle.
    TrackClick(f64),
    Preset(usize),
    JumpToStart,
    Reset,
    ToggleCollapsed,
}

/// Page keyboard shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Toggle,
    SetStart,
    SetEnd,
    JumpToStart,
}

impl KeyCommand {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "l" => Some(KeyCommand::Toggle),
            "[" => Some(KeyCommand::SetStart),
            "]" => Some(KeyCommand::SetEnd),
            "\\" => Some(KeyCommand::JumpToStart),
            _ => None,
        }
    }
}

fn percent(t: f64, duration: f64) -> f64 {
    if duration > 0.0 && t.is_finite() {
        (t / duration * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[derive(Debug, Default)]
pub struct PanelController {
    collapsed: bool,
    playhead: f64,
}

impl PanelController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self, region: &LoopRegion, presets: &[Preset]) -> PanelView {
        let duration = region.duration();
        PanelView {
            enabled: region.enabled(),
            collapsed: self.collapsed,
            start_text: format_time(region.start()),
            end_text: format_time(region.end()),
            length_text: format_time(region.length()),
            duration_text: format_time(duration),
            start_pct: percent(region.start(), duration),
            end_pct: percent(region.end(), duration),
            playhead_pct: percent(self.playhead, duration),
            presets: presets.iter().map(|p| p.label.clone()).collect(),
        }
    }

    pub fn collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn toggle_collapsed(&mut self) {
        self.collapsed = !self.collapsed;
    }

    /// Record the playback position; returns whether the view changed.
    pub fn set_playhead(&mut self, t: f64) -> bool {
        if t == self.playhead {
            return false;
        }
        self.playhead = t;
        true
    }
}

/// Parse the start field; accepted only if `0 <= t < end`.
pub fn accept_start_text(text: &str, region: &LoopRegion) -> Option<f64> {
    parse_time_input(text)
        .ok()
        .filter(|&t| t >= 0.0 && t < region.end())
}

/// Parse the end field; accepted only if `start < t <= duration`.
pub fn accept_end_text(text: &str, region: &LoopRegion) -> Option<f64> {
    parse_time_input(text)
        .ok()
        .filter(|&t| t > region.start() && t <= region.duration())
}

fn track_time(fraction: f64, region: &LoopRegion) -> f64 {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    fraction * region.duration()
}

/// Where the start handle lands when dragged to `fraction`.
pub fn drag_start_target(fraction: f64, region: &LoopRegion, gap: f64) -> f64 {
    track_time(fraction, region).min(region.end() - gap)
}

/// Where the end handle lands when dragged to `fraction`.
pub fn drag_end_target(fraction: f64, region: &LoopRegion, gap: f64) -> f64 {
    track_time(fraction, region).max(region.start() + gap)
}

/// Which handle a bare-track click moves, and to where.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackTarget {
    Start(f64),
    End(f64),
}

pub fn track_click_target(fraction: f64, region: &LoopRegion, gap: f64) -> TrackTarget {
    let t = track_time(fraction, region);
    if (t - region.start()).abs() < (t - region.end()).abs() {
        TrackTarget::Start(t.min(region.end() - gap))
    } else {
        TrackTarget::End(t.max(region.start() + gap))
    }
}

pub fn nudge_start_target(region: &LoopRegion, nudge: Nudge, step: f64, gap: f64) -> f64 {
    match nudge {
        Nudge::Back => (region.start() - step).max(0.0),
        Nudge::Forward => (region.start() + step).min(region.end() - gap),
    }
}

pub fn nudge_end_target(region: &LoopRegion, nudge: Nudge, step: f64, gap: f64) -> f64 {
    match nudge {
        Nudge::Back => (region.end() - step).max(region.start() + gap),
        Nudge::Forward => (region.end() + step).min(region.duration()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoopConfig;

    fn region() -> LoopRegion {
        LoopRegion::restored(30.0, 45.0, true, 120.0)
    }

    #[test]
    fn view_reflects_region() {
        let mut panel = PanelController::new();
        panel.set_playhead(60.0);
        let view = panel.view(&region(), &LoopConfig::default().presets);
        assert!(view.enabled);
        assert_eq!(view.start_text, "0:30");
        assert_eq!(view.end_text, "0:45");
        assert_eq!(view.length_text, "0:15");
        assert_eq!(view.duration_text, "2:00");
        assert_eq!(view.start_pct, 25.0);
        assert_eq!(view.end_pct, 37.5);
        assert_eq!(view.playhead_pct, 50.0);
        assert_eq!(view.presets.len(), 4);
    }

    #[test]
    fn text_acceptance_bounds() {
        let r = region();
        assert_eq!(accept_start_text("0:10", &r), Some(10.0));
        assert_eq!(accept_start_text("0:45", &r), None);
        assert_eq!(accept_start_text("-1", &r), None);
        assert_eq!(accept_start_text("abc", &r), None);

        assert_eq!(accept_end_text("1:00", &r), Some(60.0));
        assert_eq!(accept_end_text("2:00", &r), Some(120.0));
        assert_eq!(accept_end_text("2:01", &r), None);
        assert_eq!(accept_end_text("0:30", &r), None);
    }

    #[test]
    fn drags_keep_handle_gap() {
        let r = region();
        assert_eq!(drag_start_target(0.5, &r, 1.0), 44.0);
        assert_eq!(drag_start_target(0.125, &r, 1.0), 15.0);
        assert_eq!(drag_end_target(0.0, &r, 1.0), 31.0);
        assert_eq!(drag_end_target(2.0, &r, 1.0), 120.0);
    }

    #[test]
    fn track_click_moves_nearer_handle() {
        let r = region();
        assert_eq!(track_click_target(0.1875, &r, 1.0), TrackTarget::Start(22.5));
        assert_eq!(track_click_target(0.5, &r, 1.0), TrackTarget::End(60.0));
    }

    #[test]
    fn nudges_are_bounded() {
        let r = LoopRegion::restored(0.25, 2.0, false, 120.0);
        assert_eq!(nudge_start_target(&r, Nudge::Back, 0.5, 1.0), 0.0);
        assert_eq!(nudge_start_target(&r, Nudge::Forward, 0.5, 1.0), 0.75);
        assert_eq!(nudge_end_target(&r, Nudge::Back, 0.5, 1.0), 1.5);

        let r = LoopRegion::restored(100.0, 119.8, false, 120.0);
        assert_eq!(nudge_end_target(&r, Nudge::Forward, 0.5, 1.0), 120.0);
    }

    #[test]
    fn shortcut_keys() {
        assert_eq!(KeyCommand::from_key("l"), Some(KeyCommand::Toggle));
        assert_eq!(KeyCommand::from_key("L"), Some(KeyCommand::Toggle));
        assert_eq!(KeyCommand::from_key("["), Some(KeyCommand::SetStart));
        assert_eq!(KeyCommand::from_key("]"), Some(KeyCommand::SetEnd));
        assert_eq!(KeyCommand::from_key("\\"), Some(KeyCommand::JumpToStart));
        assert_eq!(KeyCommand::from_key("k"), None);
    }

    #[test]
    fn collapse_toggles() {
        let mut panel = PanelController::new();
        panel.toggle_collapsed();
        assert!(panel.view(&region(), &[]).collapsed);
    }
}
