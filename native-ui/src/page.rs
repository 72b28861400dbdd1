//! The simulated watch page the loop controller is injected into.
//!
//! Plays the part of the browser page: it owns the address, the one video
//! element, event listeners, repeating timers, the column of blocks below
//! the player and the feedback toast. The host re-renders (and replaces its
//! video element) on its own schedule, which is what the controller has to
//! survive.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use bl_looper::layout::inject;
use bl_looper::{
    HostEvent, HostPage, InjectedRole, ListenerId, MediaElement, MediaEventKind, MediaHandle,
    PageLocation, PanelView, SlotItem, TimerId,
};

use crate::player::SimPlayer;

const TOAST_LIFETIME: Duration = Duration::from_secs(3);

#[derive(Debug)]
struct Interval {
    period: Duration,
    next_due: Instant,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub expires: Instant,
}

/// Deterministic per-video length between 1:30 and 5:30.
pub fn duration_for(video_id: &str) -> f64 {
    let hash = video_id
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    90.0 + (hash % 240) as f64
}

pub struct SimulatedPage {
    href: String,
    player: Option<(MediaHandle, SimPlayer)>,
    listeners: BTreeMap<ListenerId, (MediaHandle, MediaEventKind)>,
    timers: BTreeMap<TimerId, Interval>,
    next_id: u64,
    slots: Vec<SlotItem>,
    panel: Option<PanelView>,
    toast: Option<Toast>,
    now: Instant,
}

impl SimulatedPage {
    pub fn new(href: &str, now: Instant) -> Self {
        let mut page = Self {
            href: String::new(),
            player: None,
            listeners: BTreeMap::new(),
            timers: BTreeMap::new(),
            next_id: 0,
            slots: Vec::new(),
            panel: None,
            toast: None,
            now,
        };
        page.navigate(href, now);
        page
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn location(&self) -> PageLocation {
        PageLocation::parse(&self.href)
    }

    /// In-page navigation: new address, and a new video element if the
    /// address is a watch page. The column below the player is re-rendered.
    pub fn navigate(&mut self, href: &str, now: Instant) {
        self.now = now;
        self.href = href.to_string();
        let location = self.location();
        self.player = match location.video_id() {
            Some(id) if location.is_video_page() => {
                let handle = MediaHandle(self.next());
                Some((handle, SimPlayer::new(duration_for(id), now)))
            }
            _ => None,
        };
        self.slots = if location.is_video_page() {
            vec![SlotItem::Metadata, SlotItem::Other]
        } else {
            vec![SlotItem::Other]
        };
        self.panel = None;
        tracing::info!(href, "page navigated");
    }

    /// The host re-renders the column below the player and drops every
    /// injected block.
    pub fn simulate_rerender(&mut self) {
        self.slots
            .retain(|item| matches!(item, SlotItem::Metadata | SlotItem::Other));
        self.panel = None;
        tracing::info!("host re-rendered, injected blocks removed");
    }

    /// The host swaps its video element for a fresh one at the same spot.
    pub fn simulate_player_swap(&mut self) {
        if let Some((_, old)) = self.player.take() {
            let player = SimPlayer::resumed(old.total_secs(), old.current_time(), self.now);
            let handle = MediaHandle(self.next());
            self.player = Some((handle, player));
            tracing::info!(media = handle.0, "host replaced the video element");
        }
    }

    pub fn player(&self) -> Option<&SimPlayer> {
        self.player.as_ref().map(|(_, p)| p)
    }

    pub fn player_mut(&mut self) -> Option<&mut SimPlayer> {
        self.player.as_mut().map(|(_, p)| p)
    }

    pub fn slots(&self) -> &[SlotItem] {
        &self.slots
    }

    pub fn has_download_row(&self) -> bool {
        self.slots.contains(&SlotItem::DownloadRow)
    }

    pub fn inject_download_row(&mut self) {
        inject(&mut self.slots, InjectedRole::DownloadRow);
    }

    pub fn panel(&self) -> Option<&PanelView> {
        self.panel.as_ref()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref().filter(|t| t.expires > self.now)
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Advance the clock to `now` and collect the events due: media
    /// notifications first, then timers.
    pub fn pump(&mut self, now: Instant) -> Vec<HostEvent> {
        self.now = now;
        let mut events = Vec::new();

        if let Some((handle, player)) = self.player.as_mut() {
            let handle = *handle;
            for kind in player.advance(now) {
                events.extend(
                    self.listeners
                        .iter()
                        .filter(|(_, entry)| **entry == (handle, kind))
                        .map(|(&listener, _)| HostEvent::Media { listener, kind }),
                );
            }
        }

        for (&id, interval) in self.timers.iter_mut() {
            if now >= interval.next_due {
                events.push(HostEvent::Timer(id));
                interval.next_due += interval.period;
                if interval.next_due <= now {
                    interval.next_due = now + interval.period;
                }
            }
        }
        events
    }

    /// Time until the earliest timer is due, for repaint scheduling.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers
            .values()
            .map(|i| i.next_due.saturating_duration_since(self.now))
            .min()
    }
}

impl HostPage for SimulatedPage {
    fn href(&self) -> String {
        self.href.clone()
    }

    fn query_media(&mut self) -> Option<MediaHandle> {
        self.player.as_ref().map(|(h, _)| *h)
    }

    fn is_connected(&self, media: MediaHandle) -> bool {
        self.player.as_ref().is_some_and(|(h, _)| *h == media)
    }

    fn media(&self, media: MediaHandle) -> Option<&dyn MediaElement> {
        match &self.player {
            Some((h, p)) if *h == media => Some(p as &dyn MediaElement),
            _ => None,
        }
    }

    fn media_mut(&mut self, media: MediaHandle) -> Option<&mut dyn MediaElement> {
        match &mut self.player {
            Some((h, p)) if *h == media => Some(p as &mut dyn MediaElement),
            _ => None,
        }
    }

    fn add_listener(&mut self, media: MediaHandle, kind: MediaEventKind) -> ListenerId {
        let id = ListenerId(self.next());
        self.listeners.insert(id, (media, kind));
        id
    }

    fn remove_listener(&mut self, listener: ListenerId) {
        self.listeners.remove(&listener);
    }

    fn set_interval(&mut self, period: Duration) -> TimerId {
        let id = TimerId(self.next());
        self.timers.insert(
            id,
            Interval {
                period,
                next_due: self.now + period,
            },
        );
        id
    }

    fn clear_interval(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }

    fn panel_exists(&self) -> bool {
        self.slots.contains(&SlotItem::LoopPanel)
    }

    fn mount_panel(&mut self, view: &PanelView) {
        inject(&mut self.slots, InjectedRole::LoopPanel);
        self.panel = Some(view.clone());
    }

    fn update_panel(&mut self, view: &PanelView) {
        if self.panel_exists() {
            self.panel = Some(view.clone());
        }
    }

    fn remove_panel(&mut self) {
        self.slots.retain(|item| *item != SlotItem::LoopPanel);
        self.panel = None;
    }

    fn show_feedback(&mut self, message: &str) {
        self.toast = Some(Toast {
            text: message.to_string(),
            expires: self.now + TOAST_LIFETIME,
        });
    }
}
