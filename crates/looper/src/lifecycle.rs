//! Lifecycle coordinator.
//!
//! Reconciles the in-memory session against the page: builds the session
//! once the media duration is known, swaps it out when the video id
//! changes, tears it down off the watch page, and periodically puts the
//! panel back if the host re-rendered it away.

use tracing::{debug, info};

use crate::config::LoopConfig;
use crate::host::{HostEvent, HostPage, ListenerId, MediaEventKind, MediaHandle, TimerId};
use crate::location::PageLocation;
use crate::session::{usable_duration, LoopSession, Services};
use crate::store::LoopStore;

/// A build waiting for the media element to report its duration.
#[derive(Debug)]
struct PendingBuild {
    video_id: String,
    media: MediaHandle,
    listeners: [ListenerId; 2],
}

/// The element a disposed session ran on and the duration it had then.
/// Hosts keep one element across videos, so until it reports fresh
/// metadata that duration still belongs to the previous video.
#[derive(Debug, Clone, Copy)]
struct Outgoing {
    media: MediaHandle,
    duration: f64,
}

pub struct LoopController {
    services: Services,
    session: Option<LoopSession>,
    pending: Option<PendingBuild>,
    outgoing: Option<Outgoing>,
    reconcile_timer: Option<TimerId>,
    heartbeat_timer: Option<TimerId>,
}

impl LoopController {
    pub fn new(config: LoopConfig, store: LoopStore) -> Self {
        Self {
            services: Services::new(config, store),
            session: None,
            pending: None,
            outgoing: None,
            reconcile_timer: None,
            heartbeat_timer: None,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.services.config
    }

    pub fn session(&self) -> Option<&LoopSession> {
        self.session.as_ref()
    }

    pub fn is_build_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Sweep stale records, start the reconcile and heartbeat timers and
    /// look at the current page.
    pub fn start(&mut self, host: &mut dyn HostPage) {
        self.services.store.sweep();
        if self.reconcile_timer.is_none() {
            self.reconcile_timer = Some(host.set_interval(self.services.config.reconcile_period()));
        }
        if self.heartbeat_timer.is_none() {
            self.heartbeat_timer = Some(host.set_interval(self.services.config.heartbeat_period()));
        }
        info!(href = %host.href(), "loop controller started");
        self.check_page(host);
    }

    /// Save, then release every timer, listener and the panel.
    pub fn shutdown(&mut self, host: &mut dyn HostPage) {
        self.save();
        self.dispose_session(host);
        self.cancel_pending(host);
        for timer in [self.reconcile_timer.take(), self.heartbeat_timer.take()]
            .into_iter()
            .flatten()
        {
            host.clear_interval(timer);
        }
        info!("loop controller stopped");
    }

    /// Dispatch one host event. Returns whether the controller consumed it;
    /// for key presses that means the host should suppress the default.
    pub fn handle(&mut self, host: &mut dyn HostPage, event: HostEvent) -> bool {
        match event {
            HostEvent::Timer(timer) => self.on_timer(host, timer),
            HostEvent::Media { listener, kind } => self.on_media(host, listener, kind),
            HostEvent::Navigated => {
                self.save();
                self.services.resolver.invalidate();
                self.check_page(host);
                true
            }
            HostEvent::BeforeUnload => {
                self.save();
                true
            }
            HostEvent::Panel(input) => match self.session.as_mut() {
                Some(session) => {
                    session.apply_input(host, &mut self.services, input);
                    true
                }
                None => false,
            },
            HostEvent::Key(key) => match self.session.as_mut() {
                Some(session) => session.handle_key(host, &mut self.services, &key),
                None => false,
            },
        }
    }

    fn save(&mut self) {
        if let Some(session) = &self.session {
            session.save(&mut self.services);
        }
    }

    fn on_timer(&mut self, host: &mut dyn HostPage, timer: TimerId) -> bool {
        if Some(timer) == self.reconcile_timer {
            self.check_page(host);
            return true;
        }
        if Some(timer) == self.heartbeat_timer {
            if let Some(session) = &self.session {
                if session.region().enabled() {
                    session.save(&mut self.services);
                }
            }
            return true;
        }
        match self.session.as_mut() {
            Some(session) => session.handle_timer(host, &mut self.services, timer),
            None => false,
        }
    }

    fn on_media(&mut self, host: &mut dyn HostPage, listener: ListenerId, kind: MediaEventKind) -> bool {
        let is_pending = self
            .pending
            .as_ref()
            .is_some_and(|p| p.listeners.contains(&listener));
        if is_pending {
            debug!(?kind, "media metadata arrived");
            self.outgoing = None;
            self.cancel_pending(host);
            self.check_page(host);
            return true;
        }
        match self.session.as_mut() {
            Some(session) => session.handle_media(host, &mut self.services, listener),
            None => false,
        }
    }

    /// Bring the controller in line with what the page currently shows.
    fn check_page(&mut self, host: &mut dyn HostPage) {
        let location = PageLocation::parse(&host.href());
        let video_id = match location.video_id() {
            Some(id) if location.is_video_page() => id.to_string(),
            _ => {
                if self.session.is_some() || self.pending.is_some() {
                    info!(path = location.path(), "left the watch page");
                }
                self.dispose_session(host);
                self.cancel_pending(host);
                return;
            }
        };

        if self.session.as_ref().is_some_and(|s| s.video_id() != video_id) {
            info!(video_id = %video_id, "video changed");
            let media = self.session.as_ref().and_then(LoopSession::media);
            self.outgoing = media.map(|media| Outgoing {
                media,
                duration: host.media(media).map_or(f64::NAN, |m| m.duration()),
            });
            self.dispose_session(host);
        }
        if self.pending.as_ref().is_some_and(|p| p.video_id != video_id) {
            self.cancel_pending(host);
        }

        if let Some(session) = self.session.as_mut() {
            if !host.panel_exists() {
                session.remount(host, &self.services.config);
            }
            session.follow_media(host, &mut self.services);
            session.rearm(host, &mut self.services);
            return;
        }
        if let Some(pending) = &self.pending {
            let waiting = host.is_connected(pending.media)
                && self.build_duration(host, pending.media).is_none();
            if waiting {
                return;
            }
            self.cancel_pending(host);
        }
        self.try_build(host, video_id);
    }

    /// Duration to build against, if `media` has one that belongs to the
    /// current video.
    fn build_duration(&self, host: &dyn HostPage, media: MediaHandle) -> Option<f64> {
        let duration = host.media(media).map_or(f64::NAN, |m| m.duration());
        let leftover = self
            .outgoing
            .is_some_and(|o| o.media == media && o.duration.to_bits() == duration.to_bits());
        if leftover {
            return None;
        }
        usable_duration(duration)
    }

    fn try_build(&mut self, host: &mut dyn HostPage, video_id: String) {
        let Some(media) = self.services.resolver.resolve(host) else {
            debug!(video_id = %video_id, "no media element yet");
            return;
        };
        match self.build_duration(host, media) {
            Some(duration) => {
                self.outgoing = None;
                let session =
                    LoopSession::build(host, &mut self.services, &video_id, media, duration);
                self.session = Some(session);
            }
            None => {
                debug!(video_id = %video_id, "duration unknown, waiting for metadata");
                let listeners = [
                    host.add_listener(media, MediaEventKind::LoadedMetadata),
                    host.add_listener(media, MediaEventKind::DurationChange),
                ];
                self.pending = Some(PendingBuild {
                    video_id,
                    media,
                    listeners,
                });
            }
        }
    }

    fn cancel_pending(&mut self, host: &mut dyn HostPage) {
        if let Some(pending) = self.pending.take() {
            for listener in pending.listeners {
                host.remove_listener(listener);
            }
        }
    }

    fn dispose_session(&mut self, host: &mut dyn HostPage) {
        if let Some(session) = self.session.take() {
            session.dispose(host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::KeyPress;
    use crate::panel::PanelInput;
    use crate::region::LoopRegion;
    use crate::store::{KeyValueStore, MemoryStore};
    use crate::testing::{FakePage, ManualClock};

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;

    fn controller_with(backend: MemoryStore, clock: &ManualClock) -> LoopController {
        let config = LoopConfig::default();
        let store = LoopStore::new(Box::new(backend), Box::new(clock.clone()), &config);
        LoopController::new(config, store)
    }

    fn saved(start: f64, end: f64, enabled: bool, saved_at: u64) -> String {
        format!(r#"{{"start":{start},"end":{end},"enabled":{enabled},"savedAt":{saved_at}}}"#)
    }

    fn started(page: &mut FakePage, backend: MemoryStore) -> (LoopController, ManualClock) {
        let clock = ManualClock::new(100 * DAY_MS);
        let mut controller = controller_with(backend, &clock);
        controller.start(page);
        (controller, clock)
    }

    #[test]
    fn fresh_video_builds_full_disabled_region() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (controller, _) = started(&mut page, MemoryStore::new());

        let session = controller.session().expect("session built");
        assert_eq!(session.video_id(), "abc12345678");
        assert_eq!(
            (session.region().start(), session.region().end(), session.region().enabled()),
            (0.0, 120.0, false)
        );
        assert!(!session.is_enforcing());
        assert!(page.panel.is_some());
    }

    #[test]
    fn saved_enabled_loop_resumes_and_snaps() {
        let mut backend = MemoryStore::new();
        backend
            .set(
                "yt-rapper-loop-abc12345678",
                &saved(30.0, 45.0, true, 98 * DAY_MS),
            )
            .unwrap();
        let mut page = FakePage::watching("abc12345678", 120.0);
        let media = page.current_media().expect("media");
        page.media_state(media).time = 5.0;
        page.media_state(media).paused = true;

        let (controller, _) = started(&mut page, backend);
        let session = controller.session().expect("session");
        assert_eq!((session.region().start(), session.region().end()), (30.0, 45.0));
        assert!(session.region().enabled());
        assert!(session.is_enforcing());

        let state = page.media_state(media);
        assert!(LoopRegion::restored(30.0, 45.0, true, 120.0).contains(state.time));
        assert!(!state.paused);
        assert!(page.feedback.iter().any(|m| m.starts_with("Loop ON: 0:30")));
    }

    #[test]
    fn navigating_to_other_video_reseeds_from_its_own_record() {
        let mut backend = MemoryStore::new();
        backend
            .set(
                "yt-rapper-loop-zzzzzzzzzzz",
                &saved(10.0, 20.0, false, 99 * DAY_MS),
            )
            .unwrap();
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, backend);
        controller.handle(&mut page, HostEvent::Panel(PanelInput::Preset(2)));
        assert_eq!(controller.session().unwrap().region().start(), 60.0);

        page.navigate("zzzzzzzzzzz", 200.0);
        controller.handle(&mut page, HostEvent::Navigated);

        let session = controller.session().expect("new session");
        assert_eq!(session.video_id(), "zzzzzzzzzzz");
        assert_eq!((session.region().start(), session.region().end()), (10.0, 20.0));
        assert!(!session.region().enabled());

        page.navigate("yyyyyyyyyyy", 200.0);
        controller.handle(&mut page, HostEvent::Navigated);
        let session = controller.session().expect("third session");
        assert_eq!((session.region().start(), session.region().end()), (0.0, 200.0));
    }

    #[test]
    fn navigation_saves_under_the_old_video_id() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::StartText("0:30".into())));

        page.navigate("zzzzzzzzzzz", 200.0);
        controller.handle(&mut page, HostEvent::Navigated);

        page.navigate("abc12345678", 120.0);
        controller.handle(&mut page, HostEvent::Navigated);
        let session = controller.session().expect("session");
        assert_eq!(session.region().start(), 30.0);
    }

    #[test]
    fn same_video_navigation_keeps_state() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::Toggle));
        assert!(controller.session().unwrap().is_enforcing());

        page.set_href("https://www.youtube.com/watch?v=abc12345678&t=42s");
        controller.handle(&mut page, HostEvent::Navigated);
        let session = controller.session().expect("session");
        assert!(session.region().enabled());
        assert!(session.is_enforcing());
    }

    #[test]
    fn leaving_watch_page_releases_everything() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::Toggle));
        // reconcile + heartbeat + playhead + enforcement
        assert_eq!(page.timer_count(), 4);

        page.set_href("https://www.youtube.com/feed/subscriptions");
        controller.handle(&mut page, HostEvent::Navigated);
        assert!(controller.session().is_none());
        assert!(page.panel.is_none());
        assert_eq!(page.timer_count(), 2);
        assert_eq!(page.listener_count(), 0);

        controller.shutdown(&mut page);
        assert_eq!(page.timer_count(), 0);
    }

    #[test]
    fn toggling_off_stops_all_corrections() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::Preset(0)));
        let enforce_timer = *page.timer_ids().last().expect("enforcement timer");

        controller.handle(&mut page, HostEvent::Panel(PanelInput::Toggle));
        assert!(!controller.session().unwrap().is_enforcing());

        let media = page.current_media().unwrap();
        page.media_state(media).time = 80.0;
        let seeks = page.media_state(media).seeks.len();
        controller.handle(&mut page, HostEvent::Timer(enforce_timer));
        assert_eq!(page.media_state(media).seeks.len(), seeks);
        assert_eq!(page.media_state(media).time, 80.0);
    }

    #[test]
    fn enforcement_events_correct_playback() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::Preset(0)));
        let media = page.current_media().unwrap();

        page.media_state(media).time = 14.95;
        let listener = page
            .listener_for(media, MediaEventKind::TimeUpdate)
            .expect("time listener");
        controller.handle(
            &mut page,
            HostEvent::Media {
                listener,
                kind: MediaEventKind::TimeUpdate,
            },
        );
        assert_eq!(page.media_state(media).time, 0.0);

        page.media_state(media).time = 40.0;
        let timer = *page.timer_ids().last().unwrap();
        controller.handle(&mut page, HostEvent::Timer(timer));
        assert_eq!(page.media_state(media).time, 0.0);
    }

    #[test]
    fn destroyed_panel_is_remounted_with_same_region() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::EndText("1:00".into())));

        page.panel = None;
        let reconcile = page.timer_ids()[0];
        controller.handle(&mut page, HostEvent::Timer(reconcile));
        let view = page.panel.as_ref().expect("remounted");
        assert_eq!(view.end_text, "1:00");
    }

    #[test]
    fn replaced_media_element_is_re_armed() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::Preset(2)));
        let old_timer = *page.timer_ids().last().unwrap();

        let fresh = page.replace_media(75.0);
        controller.handle(&mut page, HostEvent::Timer(old_timer));

        let session = controller.session().unwrap();
        assert!(session.is_enforcing());
        assert_eq!((session.region().start(), session.region().end()), (60.0, 75.0));
        assert!(page.listener_for(fresh, MediaEventKind::TimeUpdate).is_some());
        assert_eq!(page.timer_count(), 4);
    }

    #[test]
    fn build_waits_for_metadata() {
        let mut page = FakePage::watching("abc12345678", f64::NAN);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        assert!(controller.session().is_none());
        assert!(controller.is_build_pending());
        assert_eq!(page.listener_count(), 2);

        let media = page.current_media().unwrap();
        page.media_state(media).duration = 90.0;
        let listener = page
            .listener_for(media, MediaEventKind::DurationChange)
            .unwrap();
        controller.handle(
            &mut page,
            HostEvent::Media {
                listener,
                kind: MediaEventKind::DurationChange,
            },
        );
        assert!(!controller.is_build_pending());
        // Only the session's own duration subscription is left.
        assert_eq!(page.listener_count(), 1);
        let watch = page.listener_for(media, MediaEventKind::DurationChange);
        assert!(watch.is_some_and(|id| id != listener));
        assert_eq!(controller.session().unwrap().region().end(), 90.0);
    }

    #[test]
    fn pending_build_cancelled_by_video_change() {
        let mut page = FakePage::watching("abc12345678", f64::NAN);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        assert!(controller.is_build_pending());

        page.navigate("zzzzzzzzzzz", 60.0);
        controller.handle(&mut page, HostEvent::Navigated);
        assert!(!controller.is_build_pending());
        assert_eq!(controller.session().unwrap().video_id(), "zzzzzzzzzzz");
        assert_eq!(page.listener_count(), 1);
    }

    #[test]
    fn heartbeat_saves_only_while_enabled() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let clock = ManualClock::new(100 * DAY_MS);
        let mut controller = controller_with(MemoryStore::new(), &clock);
        controller.start(&mut page);
        let heartbeat = page.timer_ids()[1];

        controller.handle(&mut page, HostEvent::Timer(heartbeat));
        assert!(controller.services.store.backend().keys().unwrap().is_empty());

        controller.handle(&mut page, HostEvent::Panel(PanelInput::Toggle));
        clock.advance(5_000);
        controller.handle(&mut page, HostEvent::Timer(heartbeat));
        let raw = controller
            .services
            .store
            .backend()
            .get("yt-rapper-loop-abc12345678")
            .unwrap()
            .expect("saved");
        assert!(raw.contains(&format!("{}", 100 * DAY_MS + 5_000)));
    }

    #[test]
    fn keys_respect_text_focus() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        let media = page.current_media().unwrap();
        page.media_state(media).time = 42.0;

        let typing = KeyPress {
            key: "[".into(),
            in_text_input: true,
        };
        assert!(!controller.handle(&mut page, HostEvent::Key(typing)));
        assert_eq!(controller.session().unwrap().region().start(), 0.0);

        assert!(controller.handle(&mut page, HostEvent::Key(KeyPress::new("["))));
        assert_eq!(controller.session().unwrap().region().start(), 42.0);
        assert_eq!(page.feedback.last().map(String::as_str), Some("Loop start: 0:42"));

        assert!(!controller.handle(&mut page, HostEvent::Key(KeyPress::new("x"))));
    }

    #[test]
    fn invalid_text_reverts_field() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::StartText("banana".into())));
        let view = page.panel.as_ref().unwrap();
        assert_eq!(view.start_text, "0:00");
        assert_eq!(controller.session().unwrap().region().start(), 0.0);
    }

    #[test]
    fn reset_turns_loop_off() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::Preset(1)));
        assert!(controller.session().unwrap().is_enforcing());

        controller.handle(&mut page, HostEvent::Panel(PanelInput::Reset));
        let session = controller.session().unwrap();
        assert!(!session.region().enabled());
        assert!(!session.is_enforcing());
        assert_eq!((session.region().start(), session.region().end()), (0.0, 120.0));
    }

    fn stored_bounds(controller: &mut LoopController, video_id: &str) -> (f64, f64, bool) {
        let state = controller.services.store.load(video_id).expect("stored record");
        (state.start, state.end, state.enabled)
    }

    fn fire(
        controller: &mut LoopController,
        page: &mut FakePage,
        media: MediaHandle,
        kind: MediaEventKind,
    ) {
        let listener = page.listener_for(media, kind).expect("listener registered");
        controller.handle(page, HostEvent::Media { listener, kind });
    }

    #[test]
    fn reused_element_waits_for_the_next_videos_duration() {
        let mut backend = MemoryStore::new();
        backend
            .set(
                "yt-rapper-loop-zzzzzzzzzzz",
                &saved(100.0, 200.0, true, 99 * DAY_MS),
            )
            .unwrap();
        let mut page = FakePage::watching("abc12345678", 60.0);
        let (mut controller, _) = started(&mut page, backend);
        let media = page.current_media().unwrap();

        // Same element, new address: the 60 s duration is the old video's.
        page.set_href("https://www.youtube.com/watch?v=zzzzzzzzzzz");
        controller.handle(&mut page, HostEvent::Navigated);
        assert!(controller.session().is_none());
        assert!(controller.is_build_pending());

        let reconcile = page.timer_ids()[0];
        controller.handle(&mut page, HostEvent::Timer(reconcile));
        assert!(controller.is_build_pending());

        page.media_state(media).duration = 300.0;
        fire(&mut controller, &mut page, media, MediaEventKind::DurationChange);

        let session = controller.session().expect("session on the new duration");
        assert_eq!(session.video_id(), "zzzzzzzzzzz");
        assert_eq!((session.region().start(), session.region().end()), (100.0, 200.0));
        assert!(session.is_enforcing());
        assert_eq!(
            stored_bounds(&mut controller, "zzzzzzzzzzz"),
            (100.0, 200.0, true)
        );
    }

    #[test]
    fn late_duration_change_reapplies_stored_bounds() {
        let mut backend = MemoryStore::new();
        backend
            .set(
                "yt-rapper-loop-abc12345678",
                &saved(100.0, 200.0, true, 99 * DAY_MS),
            )
            .unwrap();
        let mut page = FakePage::watching("abc12345678", 60.0);
        let (mut controller, _) = started(&mut page, backend);
        let media = page.current_media().unwrap();
        let session = controller.session().unwrap();
        assert_eq!((session.region().start(), session.region().end()), (0.0, 60.0));

        page.media_state(media).duration = 300.0;
        fire(&mut controller, &mut page, media, MediaEventKind::DurationChange);
        let session = controller.session().unwrap();
        assert_eq!((session.region().start(), session.region().end()), (100.0, 200.0));
        assert!(session.region().enabled());
        assert_eq!(
            stored_bounds(&mut controller, "abc12345678"),
            (100.0, 200.0, true)
        );

        // Once edited, the region is only re-clamped.
        controller.handle(&mut page, HostEvent::Panel(PanelInput::StartText("1:00".into())));
        page.media_state(media).duration = 150.0;
        fire(&mut controller, &mut page, media, MediaEventKind::DurationChange);
        let session = controller.session().unwrap();
        assert_eq!((session.region().start(), session.region().end()), (60.0, 150.0));
    }

    #[test]
    fn loop_turned_on_without_media_snaps_once_armed() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::StartText("0:30".into())));

        page.remove_media();
        controller.handle(&mut page, HostEvent::Panel(PanelInput::Toggle));
        let session = controller.session().unwrap();
        assert!(session.region().enabled());
        assert!(!session.is_enforcing());

        let fresh = page.replace_media(120.0);
        page.media_state(fresh).paused = true;
        let reconcile = page.timer_ids()[0];
        controller.handle(&mut page, HostEvent::Timer(reconcile));

        assert!(controller.session().unwrap().is_enforcing());
        let state = page.media_state(fresh);
        assert_eq!(state.seeks, vec![30.0]);
        assert!(!state.paused);
        assert_eq!(state.plays, 1);

        // Later re-arms leave playback alone.
        let fresher = page.replace_media(120.0);
        page.media_state(fresher).time = 5.0;
        controller.handle(&mut page, HostEvent::Timer(reconcile));
        let timer = *page.timer_ids().last().unwrap();
        controller.handle(&mut page, HostEvent::Timer(timer));
        assert_eq!(page.media_state(fresher).plays, 0);
    }

    #[test]
    fn key_feedback_reports_the_clamped_bound() {
        let mut page = FakePage::watching("abc12345678", 120.0);
        let (mut controller, _) = started(&mut page, MemoryStore::new());
        controller.handle(&mut page, HostEvent::Panel(PanelInput::StartText("0:30".into())));
        let media = page.current_media().unwrap();
        page.media_state(media).time = 10.0;

        assert!(controller.handle(&mut page, HostEvent::Key(KeyPress::new("]"))));
        let end = controller.session().unwrap().region().end();
        assert!(end > 30.0 && end < 31.0, "end = {end}");
        assert_eq!(page.feedback.last().map(String::as_str), Some("Loop end: 0:30"));
    }
}
