//! Scripted host used by the unit tests.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::Clock;
use crate::host::{HostPage, ListenerId, MediaElement, MediaEventKind, MediaHandle, TimerId};
use crate::panel::PanelView;

/// Shared, hand-advanced clock.
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self(Rc::new(Cell::new(now_ms)))
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeMedia {
    pub time: f64,
    pub duration: f64,
    pub paused: bool,
    pub ended: bool,
    /// Every `set_current_time` target, in order.
    pub seeks: Vec<f64>,
    pub plays: usize,
}

impl MediaElement for FakeMedia {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn set_current_time(&mut self, t: f64) {
        self.seeks.push(t);
        self.time = t;
        self.ended = false;
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn ended(&self) -> bool {
        self.ended
    }

    fn play(&mut self) {
        self.plays += 1;
        self.paused = false;
        self.ended = false;
    }
}

#[derive(Debug, Default)]
pub struct FakePage {
    href: String,
    elements: BTreeMap<MediaHandle, FakeMedia>,
    current: Option<MediaHandle>,
    listeners: BTreeMap<ListenerId, (MediaHandle, MediaEventKind)>,
    timers: BTreeMap<TimerId, Duration>,
    next_id: u64,
    pub media_queries: usize,
    pub panel: Option<PanelView>,
    pub feedback: Vec<String>,
}

impl FakePage {
    /// A watch page for `video_id` with one playing media element.
    pub fn watching(video_id: &str, duration: f64) -> Self {
        let mut page = Self::default();
        page.navigate(video_id, duration);
        page
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn set_href(&mut self, href: &str) {
        self.href = href.to_string();
    }

    /// Address change plus a fresh media element, like an in-page
    /// navigation to another video.
    pub fn navigate(&mut self, video_id: &str, duration: f64) -> MediaHandle {
        self.set_href(&format!("https://www.youtube.com/watch?v={video_id}"));
        self.replace_media(duration)
    }

    /// Swap the media element for a new one; the old handle goes stale.
    pub fn replace_media(&mut self, duration: f64) -> MediaHandle {
        let handle = MediaHandle(self.next());
        self.elements.insert(
            handle,
            FakeMedia {
                duration,
                ..FakeMedia::default()
            },
        );
        self.current = Some(handle);
        handle
    }

    pub fn remove_media(&mut self) {
        self.current = None;
    }

    pub fn current_media(&self) -> Option<MediaHandle> {
        self.current
    }

    pub fn media_state(&mut self, media: MediaHandle) -> &mut FakeMedia {
        self.elements.get_mut(&media).expect("unknown media handle")
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listener_for(&self, media: MediaHandle, kind: MediaEventKind) -> Option<ListenerId> {
        self.listeners
            .iter()
            .find(|(_, entry)| **entry == (media, kind))
            .map(|(&id, _)| id)
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Live timers in creation order.
    pub fn timer_ids(&self) -> Vec<TimerId> {
        self.timers.keys().copied().collect()
    }
}

impl HostPage for FakePage {
    fn href(&self) -> String {
        self.href.clone()
    }

    fn query_media(&mut self) -> Option<MediaHandle> {
        self.media_queries += 1;
        self.current
    }

    fn is_connected(&self, media: MediaHandle) -> bool {
        self.current == Some(media)
    }

    fn media(&self, media: MediaHandle) -> Option<&dyn MediaElement> {
        self.elements.get(&media).map(|m| m as &dyn MediaElement)
    }

    fn media_mut(&mut self, media: MediaHandle) -> Option<&mut dyn MediaElement> {
        self.elements
            .get_mut(&media)
            .map(|m| m as &mut dyn MediaElement)
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
        self.timers.insert(id, period);
        id
    }

    fn clear_interval(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }

    fn panel_exists(&self) -> bool {
        self.panel.is_some()
    }

    fn mount_panel(&mut self, view: &PanelView) {
        self.panel = Some(view.clone());
    }

    fn update_panel(&mut self, view: &PanelView) {
        if self.panel.is_some() {
            self.panel = Some(view.clone());
        }
    }

    fn remove_panel(&mut self) {
        self.panel = None;
    }

    fn show_feedback(&mut self, message: &str) {
        self.feedback.push(message.to_string());
    }
}
