//! One video's loop session.
//!
//! A [`LoopSession`] owns the region, the enforcement engine and the panel
//! state for a single video id. It is built once the media duration is
//! known, and disposed when the page moves to another video or off the
//! watch page. Nothing in here survives disposal except what was persisted.

use tracing::{debug, info};

use crate::config::LoopConfig;
use crate::enforcement::{EnforcementEngine, Trigger, TriggerOutcome};
use crate::host::{HostPage, KeyPress, ListenerId, MediaEventKind, MediaHandle, TimerId};
use crate::panel::{self, KeyCommand, PanelController, PanelInput, PanelView, TrackTarget};
use crate::region::LoopRegion;
use crate::resolver::MediaResolver;
use crate::store::LoopStore;
use crate::timefmt::format_time;

/// Controller-wide collaborators a session borrows on every call.
pub struct Services {
    pub config: LoopConfig,
    pub resolver: MediaResolver,
    pub store: LoopStore,
}

impl Services {
    pub fn new(config: LoopConfig, store: LoopStore) -> Self {
        Self {
            config,
            resolver: MediaResolver::new(),
            store,
        }
    }
}

/// A media duration the region can be applied to.
pub fn usable_duration(duration: f64) -> Option<f64> {
    (duration.is_finite() && duration > 0.0).then_some(duration)
}

/// Bounds read from storage, kept until the user edits the region so a
/// later duration change can re-apply them instead of the clamped copy.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Seed {
    start: f64,
    end: f64,
}

pub struct LoopSession {
    video_id: String,
    region: LoopRegion,
    seed: Option<Seed>,
    enforcement: EnforcementEngine,
    panel: PanelController,
    playhead_timer: Option<TimerId>,
    /// `DurationChange` subscription on the element the region follows.
    duration_watch: Option<(MediaHandle, ListenerId)>,
    /// Turned on while no element was around; snap on the first arm.
    snap_on_arm: bool,
}

impl LoopSession {
    /// Seed the region from storage (or full length), mount the panel and,
    /// if the saved loop was on, turn it back on.
    pub fn build(
        host: &mut dyn HostPage,
        services: &mut Services,
        video_id: &str,
        media: MediaHandle,
        duration: f64,
    ) -> Self {
        let saved = services.store.load(video_id);
        let seed = saved.as_ref().map(|state| Seed {
            start: state.start,
            end: state.end,
        });
        let region = match seed {
            Some(seed) => LoopRegion::restored(seed.start, seed.end, false, duration),
            None => LoopRegion::full(duration),
        };
        let config = &services.config;
        let mut session = Self {
            video_id: video_id.to_string(),
            region,
            seed,
            enforcement: EnforcementEngine::new(config.enforce_period(), config.tolerances()),
            panel: PanelController::new(),
            playhead_timer: None,
            duration_watch: None,
            snap_on_arm: false,
        };

        session.watch_duration(host, media);
        host.mount_panel(&session.view(config));
        session.playhead_timer = Some(host.set_interval(config.playhead_period()));
        info!(
            video_id,
            start = session.region.start(),
            end = session.region.end(),
            restored = saved.is_some(),
            "loop panel built"
        );

        if saved.as_ref().is_some_and(|state| state.enabled) {
            session.toggle(host, services);
        }
        session
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn region(&self) -> &LoopRegion {
        &self.region
    }

    pub fn is_enforcing(&self) -> bool {
        self.enforcement.is_enforcing()
    }

    /// The element whose duration the region currently follows.
    pub fn media(&self) -> Option<MediaHandle> {
        self.duration_watch.map(|(media, _)| media)
    }

    pub fn view(&self, config: &LoopConfig) -> PanelView {
        self.panel.view(&self.region, &config.presets)
    }

    fn render(&self, host: &mut dyn HostPage, config: &LoopConfig) {
        host.update_panel(&self.view(config));
    }

    /// Re-render and persist after a model change.
    fn commit(&mut self, host: &mut dyn HostPage, services: &mut Services) {
        self.render(host, &services.config);
        services.store.save(&self.video_id, &self.region);
    }

    pub fn save(&self, services: &mut Services) {
        services.store.save(&self.video_id, &self.region);
    }

    fn current_time(host: &mut dyn HostPage, services: &mut Services) -> Option<f64> {
        let media = services.resolver.resolve(host)?;
        host.media(media).map(|m| m.current_time())
    }

    pub fn set_start(&mut self, host: &mut dyn HostPage, services: &mut Services, t: f64) {
        self.seed = None;
        self.region.set_start(t);
        self.commit(host, services);
    }

    pub fn set_end(&mut self, host: &mut dyn HostPage, services: &mut Services, t: f64) {
        self.seed = None;
        self.region.set_end(t);
        self.commit(host, services);
    }

    /// Move playback into the region and make sure it is playing.
    fn snap_and_play(&self, host: &mut dyn HostPage, media: MediaHandle) {
        if let Some(element) = host.media_mut(media) {
            if !self.region.contains(element.current_time()) {
                element.set_current_time(self.region.start());
            }
            if element.paused() || element.ended() {
                element.play();
            }
        }
    }

    /// Flip the loop. Turning it on attaches enforcement, snaps playback
    /// into the region and resumes it; turning it off detaches.
    pub fn toggle(&mut self, host: &mut dyn HostPage, services: &mut Services) {
        if self.region.toggle() {
            match services.resolver.resolve(host) {
                Some(media) => {
                    self.arm(host, media);
                    self.snap_and_play(host, media);
                }
                None => self.snap_on_arm = true,
            }
            host.show_feedback(&format!(
                "Loop ON: {} \u{2192} {}",
                format_time(self.region.start()),
                format_time(self.region.end())
            ));
        } else {
            self.snap_on_arm = false;
            self.enforcement.detach(host);
            host.show_feedback("Loop OFF");
        }
        self.commit(host, services);
    }

    /// Apply preset `index`: both bounds at once, then make sure the loop
    /// is on.
    pub fn apply_preset(&mut self, host: &mut dyn HostPage, services: &mut Services, index: usize) {
        let Some(preset) = services.config.presets.get(index) else {
            debug!(index, "unknown preset");
            return;
        };
        let duration = self.region.duration();
        let end = preset.end.map_or(duration, |end| end.min(duration));
        self.seed = None;
        self.region.set_bounds(preset.start, end);
        if self.region.enabled() {
            self.commit(host, services);
        } else {
            self.toggle(host, services);
        }
    }

    /// Back to the full length, loop off.
    pub fn reset(&mut self, host: &mut dyn HostPage, services: &mut Services) {
        self.seed = None;
        if self.region.reset() {
            self.snap_on_arm = false;
            self.enforcement.detach(host);
            host.show_feedback("Loop OFF");
        }
        self.commit(host, services);
    }

    pub fn jump_to_start(&mut self, host: &mut dyn HostPage, services: &mut Services) {
        if let Some(media) = services.resolver.resolve(host) {
            if let Some(element) = host.media_mut(media) {
                element.set_current_time(self.region.start());
            }
        }
    }

    fn watch_duration(&mut self, host: &mut dyn HostPage, media: MediaHandle) {
        if self.media() == Some(media) {
            return;
        }
        if let Some((_, listener)) = self.duration_watch.take() {
            host.remove_listener(listener);
        }
        let listener = host.add_listener(media, MediaEventKind::DurationChange);
        self.duration_watch = Some((media, listener));
    }

    /// Apply a newly known duration: stored bounds are re-seeded as long as
    /// the user has not edited them, otherwise the region is re-clamped.
    /// Returns whether the region changed.
    fn apply_duration(&mut self, duration: f64) -> bool {
        let before = self.region;
        match self.seed {
            Some(seed) => {
                self.region =
                    LoopRegion::restored(seed.start, seed.end, self.region.enabled(), duration)
            }
            None => self.region.clamp_to(duration),
        }
        self.region != before
    }

    /// Follow `media`'s duration and attach enforcement to it.
    fn arm(&mut self, host: &mut dyn HostPage, media: MediaHandle) {
        self.watch_duration(host, media);
        if let Some(duration) = host.media(media).and_then(|m| usable_duration(m.duration())) {
            self.apply_duration(duration);
        }
        self.enforcement.attach(host, media);
    }

    /// Move the duration subscription to the element the page shows now,
    /// after the host swapped it.
    pub fn follow_media(&mut self, host: &mut dyn HostPage, services: &mut Services) {
        let Some(media) = services.resolver.resolve(host) else {
            return;
        };
        if self.media() == Some(media) {
            return;
        }
        self.watch_duration(host, media);
        let duration = host.media(media).and_then(|m| usable_duration(m.duration()));
        if let Some(duration) = duration {
            if self.apply_duration(duration) {
                self.commit(host, services);
            }
        }
    }

    /// The followed element reported a new duration.
    fn on_duration_change(&mut self, host: &mut dyn HostPage, services: &mut Services) {
        let Some(media) = self.media() else {
            return;
        };
        let Some(duration) = host.media(media).and_then(|m| usable_duration(m.duration())) else {
            return;
        };
        if self.apply_duration(duration) {
            info!(
                video_id = %self.video_id,
                duration,
                start = self.region.start(),
                end = self.region.end(),
                "duration changed, region re-applied"
            );
            self.commit(host, services);
        }
    }

    /// Re-attach enforcement on a freshly resolved element when the loop is
    /// on but nothing is enforcing it (e.g. the element was replaced). A loop
    /// turned on before any element existed is snapped into place here.
    pub fn rearm(&mut self, host: &mut dyn HostPage, services: &mut Services) {
        if !self.region.enabled() || self.enforcement.is_enforcing() {
            return;
        }
        match services.resolver.resolve(host) {
            Some(media) => {
                self.arm(host, media);
                if std::mem::take(&mut self.snap_on_arm) {
                    self.snap_and_play(host, media);
                }
                self.render(host, &services.config);
            }
            None => debug!(video_id = %self.video_id, "no media to re-arm on yet"),
        }
    }

    fn run_trigger(&mut self, host: &mut dyn HostPage, services: &mut Services, trigger: Trigger) {
        if self.enforcement.on_trigger(host, trigger, &self.region) == TriggerOutcome::Stale {
            info!(video_id = %self.video_id, "media element went stale, re-arming");
            self.rearm(host, services);
        }
    }

    /// Route a timer tick. Returns whether the timer belongs to this session.
    pub fn handle_timer(
        &mut self,
        host: &mut dyn HostPage,
        services: &mut Services,
        timer: TimerId,
    ) -> bool {
        if let Some(trigger) = self.enforcement.timer_trigger(timer) {
            self.run_trigger(host, services, trigger);
            return true;
        }
        if self.playhead_timer == Some(timer) {
            if let Some(t) = Self::current_time(host, services) {
                if self.panel.set_playhead(t) && host.panel_exists() {
                    self.render(host, &services.config);
                }
            }
            return true;
        }
        false
    }

    /// Route a media notification. Returns whether it was ours.
    pub fn handle_media(
        &mut self,
        host: &mut dyn HostPage,
        services: &mut Services,
        listener: ListenerId,
    ) -> bool {
        if let Some(trigger) = self.enforcement.listener_trigger(listener) {
            self.run_trigger(host, services, trigger);
            return true;
        }
        if self.duration_watch.is_some_and(|(_, own)| own == listener) {
            self.on_duration_change(host, services);
            return true;
        }
        false
    }

    pub fn apply_input(&mut self, host: &mut dyn HostPage, services: &mut Services, input: PanelInput) {
        let gap = services.config.handle_gap_secs;
        let step = services.config.nudge_step_secs;
        match input {
            PanelInput::Toggle => self.toggle(host, services),
            PanelInput::StartText(text) => match panel::accept_start_text(&text, &self.region) {
                Some(t) => self.set_start(host, services, t),
                None => {
                    debug!(text = %text, "start text rejected");
                    self.render(host, &services.config);
                }
            },
            PanelInput::EndText(text) => match panel::accept_end_text(&text, &self.region) {
                Some(t) => self.set_end(host, services, t),
                None => {
                    debug!(text = %text, "end text rejected");
                    self.render(host, &services.config);
                }
            },
            PanelInput::SetStartHere => {
                if let Some(t) = Self::current_time(host, services) {
                    self.set_start(host, services, t);
                }
            }
            PanelInput::SetEndHere => {
                if let Some(t) = Self::current_time(host, services) {
                    self.set_end(host, services, t);
                }
            }
            PanelInput::NudgeStart(nudge) => {
                let t = panel::nudge_start_target(&self.region, nudge, step, gap);
                self.set_start(host, services, t);
            }
            PanelInput::NudgeEnd(nudge) => {
                let t = panel::nudge_end_target(&self.region, nudge, step, gap);
                self.set_end(host, services, t);
            }
            PanelInput::DragStart(fraction) => {
                let t = panel::drag_start_target(fraction, &self.region, gap);
                self.set_start(host, services, t);
            }
            PanelInput::DragEnd(fraction) => {
                let t = panel::drag_end_target(fraction, &self.region, gap);
                self.set_end(host, services, t);
            }
            PanelInput::TrackClick(fraction) => {
                match panel::track_click_target(fraction, &self.region, gap) {
                    TrackTarget::Start(t) => self.set_start(host, services, t),
                    TrackTarget::End(t) => self.set_end(host, services, t),
                }
            }
            PanelInput::Preset(index) => self.apply_preset(host, services, index),
            PanelInput::JumpToStart => self.jump_to_start(host, services),
            PanelInput::Reset => self.reset(host, services),
            PanelInput::ToggleCollapsed => {
                self.panel.toggle_collapsed();
                self.render(host, &services.config);
            }
        }
    }

    /// Keyboard shortcuts. Returns whether the key was consumed.
    pub fn handle_key(&mut self, host: &mut dyn HostPage, services: &mut Services, key: &KeyPress) -> bool {
        if key.in_text_input || !host.panel_exists() {
            return false;
        }
        let Some(command) = KeyCommand::from_key(&key.key) else {
            return false;
        };
        let Some(now) = Self::current_time(host, services) else {
            return false;
        };
        match command {
            KeyCommand::Toggle => self.toggle(host, services),
            KeyCommand::SetStart => {
                self.set_start(host, services, now);
                host.show_feedback(&format!("Loop start: {}", format_time(self.region.start())));
            }
            KeyCommand::SetEnd => {
                self.set_end(host, services, now);
                host.show_feedback(&format!("Loop end: {}", format_time(self.region.end())));
            }
            KeyCommand::JumpToStart => {
                self.jump_to_start(host, services);
                host.show_feedback("Jumped to loop start");
            }
        }
        true
    }

    /// Put the panel back after the host destroyed it. The in-memory region
    /// is kept as is.
    pub fn remount(&mut self, host: &mut dyn HostPage, config: &LoopConfig) {
        debug!(video_id = %self.video_id, "remounting loop panel");
        host.mount_panel(&self.view(config));
    }

    /// Release everything this session registered with the host.
    pub fn dispose(mut self, host: &mut dyn HostPage) {
        self.enforcement.detach(host);
        if let Some((_, listener)) = self.duration_watch.take() {
            host.remove_listener(listener);
        }
        if let Some(timer) = self.playhead_timer.take() {
            host.clear_interval(timer);
        }
        host.remove_panel();
        info!(video_id = %self.video_id, "loop session disposed");
    }
}
