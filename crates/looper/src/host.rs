//! The host surface the controller runs against.
//!
//! The host owns the media element, the timers and the injected panel. The
//! controller only holds the opaque ids handed out here and revalidates them
//! before every use.

use std::time::Duration;

use crate::panel::{PanelInput, PanelView};

/// Non-owning reference to a media element, issued by [`HostPage::query_media`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaHandle(pub u64);

/// A subscription registered with [`HostPage::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// A repeating timer registered with [`HostPage::set_interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEventKind {
    /// Playback position changed (coarse, throttled by the host).
    TimeUpdate,
    Ended,
    LoadedMetadata,
    DurationChange,
}

/// Playback surface of a media element.
pub trait MediaElement {
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, t: f64);
    /// Total length in seconds; NaN or infinite until metadata has loaded.
    fn duration(&self) -> f64;
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;
    fn play(&mut self);
}

/// The page the controller is injected into.
pub trait HostPage {
    /// Current address of the page.
    fn href(&self) -> String;

    /// Search the page for the active media element.
    fn query_media(&mut self) -> Option<MediaHandle>;
    /// Whether `media` is still attached to the live page.
    fn is_connected(&self, media: MediaHandle) -> bool;
    fn media(&self, media: MediaHandle) -> Option<&dyn MediaElement>;
    fn media_mut(&mut self, media: MediaHandle) -> Option<&mut dyn MediaElement>;

    fn add_listener(&mut self, media: MediaHandle, kind: MediaEventKind) -> ListenerId;
    /// Removing an unknown listener is a no-op.
    fn remove_listener(&mut self, listener: ListenerId);

    fn set_interval(&mut self, period: Duration) -> TimerId;
    /// Clearing an unknown timer is a no-op.
    fn clear_interval(&mut self, timer: TimerId);

    /// Whether the injected loop panel is still present in the page.
    fn panel_exists(&self) -> bool;
    /// Inject the loop panel into its slot, replacing any previous one.
    fn mount_panel(&mut self, view: &PanelView);
    fn update_panel(&mut self, view: &PanelView);
    fn remove_panel(&mut self);

    /// Short-lived feedback toast.
    fn show_feedback(&mut self, message: &str);
}

/// A key pressed on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    /// Focus was inside a text input when the key was pressed.
    pub in_text_input: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            in_text_input: false,
        }
    }
}

/// Everything the host delivers to [`crate::LoopController::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Timer(TimerId),
    Media {
        listener: ListenerId,
        kind: MediaEventKind,
    },
    /// The page address changed without a reload.
    Navigated,
    BeforeUnload,
    Panel(PanelInput),
    Key(KeyPress),
}
