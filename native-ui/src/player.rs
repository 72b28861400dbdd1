//! Simulated video element.
//!
//! Playback time follows the wall clock the same way a real player does:
//! the position is `start_time + elapsed` since the last play or seek. The
//! host advances it once per frame and collects the media notifications the
//! element would fire (coarse time updates, ended, metadata).

use std::time::{Duration, Instant};

use bl_looper::{MediaElement, MediaEventKind};

/// How often a playing element reports its position.
const TIME_UPDATE_PERIOD: Duration = Duration::from_millis(250);

/// Delay before metadata (and so the duration) becomes known.
pub const METADATA_DELAY: Duration = Duration::from_millis(400);

#[derive(Clone, Debug, PartialEq)]
pub enum PlayerState {
    /// Metadata not loaded yet; duration unknown.
    Loading,
    Playing,
    Paused,
    Ended,
}

impl PlayerState {
    pub fn label(&self) -> &str {
        match self {
            Self::Loading => "Loading...",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Ended => "Ended",
        }
    }
}

#[derive(Debug)]
pub struct SimPlayer {
    state: PlayerState,
    duration_secs: f64,
    metadata_at: Instant,
    /// Play requested before metadata arrived.
    autoplay: bool,

    now: Instant,
    current_time_secs: f64,
    /// Instant when playback last started (used for wall-clock sync).
    playback_start_instant: Option<Instant>,
    playback_start_time_secs: f64,
    last_time_update: Instant,
}

impl SimPlayer {
    /// A player for a video of `duration_secs` that autoplays once its
    /// metadata has loaded.
    pub fn new(duration_secs: f64, now: Instant) -> Self {
        Self {
            state: PlayerState::Loading,
            duration_secs,
            metadata_at: now + METADATA_DELAY,
            autoplay: true,
            now,
            current_time_secs: 0.0,
            playback_start_instant: None,
            playback_start_time_secs: 0.0,
            last_time_update: now,
        }
    }

    /// A player that already has its metadata and is playing from
    /// `position`, as after the host swapped elements mid-playback.
    pub fn resumed(duration_secs: f64, position: f64, now: Instant) -> Self {
        let mut player = Self::new(duration_secs, now);
        player.metadata_at = now;
        player.state = PlayerState::Paused;
        player.current_time_secs = position.clamp(0.0, duration_secs);
        player.play();
        player
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn total_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.sync_time();
            self.state = PlayerState::Paused;
            self.playback_start_instant = None;
            tracing::debug!("player: pause at {:.2}s", self.current_time_secs);
        }
    }

    pub fn toggle_play_pause(&mut self) {
        match self.state {
            PlayerState::Playing => self.pause(),
            PlayerState::Paused | PlayerState::Ended => self.play(),
            PlayerState::Loading => self.autoplay = !self.autoplay,
        }
    }

    /// Move the clock to `now` and return the notifications fired meanwhile.
    pub fn advance(&mut self, now: Instant) -> Vec<MediaEventKind> {
        self.now = now;
        let mut events = Vec::new();

        if self.state == PlayerState::Loading {
            if now < self.metadata_at {
                return events;
            }
            self.state = PlayerState::Paused;
            events.push(MediaEventKind::LoadedMetadata);
            events.push(MediaEventKind::DurationChange);
            tracing::debug!(duration = self.duration_secs, "player: metadata loaded");
            if self.autoplay {
                self.play();
            }
        }

        if self.state == PlayerState::Playing {
            self.sync_time();
            if self.current_time_secs >= self.duration_secs {
                self.current_time_secs = self.duration_secs;
                self.playback_start_instant = None;
                self.state = PlayerState::Ended;
                events.push(MediaEventKind::TimeUpdate);
                events.push(MediaEventKind::Ended);
            } else if now.duration_since(self.last_time_update) >= TIME_UPDATE_PERIOD {
                self.last_time_update = now;
                events.push(MediaEventKind::TimeUpdate);
            }
        }
        events
    }

    fn sync_time(&mut self) {
        if let Some(start_instant) = self.playback_start_instant {
            let elapsed = self.now.saturating_duration_since(start_instant).as_secs_f64();
            self.current_time_secs =
                (self.playback_start_time_secs + elapsed).min(self.duration_secs);
        }
    }
}

impl MediaElement for SimPlayer {
    fn current_time(&self) -> f64 {
        match self.playback_start_instant {
            Some(start_instant) => {
                let elapsed = self.now.saturating_duration_since(start_instant).as_secs_f64();
                (self.playback_start_time_secs + elapsed).min(self.duration_secs)
            }
            None => self.current_time_secs,
        }
    }

    fn set_current_time(&mut self, t: f64) {
        if self.state == PlayerState::Loading {
            return;
        }
        self.current_time_secs = t.clamp(0.0, self.duration_secs);
        if self.state == PlayerState::Ended {
            self.state = PlayerState::Paused;
        }
        if self.state == PlayerState::Playing {
            self.playback_start_instant = Some(self.now);
            self.playback_start_time_secs = self.current_time_secs;
        }
        tracing::trace!("player: seek to {:.2}s", self.current_time_secs);
    }

    fn duration(&self) -> f64 {
        match self.state {
            PlayerState::Loading => f64::NAN,
            _ => self.duration_secs,
        }
    }

    fn paused(&self) -> bool {
        self.state != PlayerState::Playing
    }

    fn ended(&self) -> bool {
        self.state == PlayerState::Ended
    }

    fn play(&mut self) {
        match self.state {
            PlayerState::Loading => self.autoplay = true,
            PlayerState::Playing => {}
            PlayerState::Paused | PlayerState::Ended => {
                if self.state == PlayerState::Ended {
                    self.current_time_secs = 0.0;
                }
                self.state = PlayerState::Playing;
                self.playback_start_instant = Some(self.now);
                self.playback_start_time_secs = self.current_time_secs;
                self.last_time_update = self.now;
                tracing::debug!("player: play (from {:.2}s)", self.current_time_secs);
            }
        }
    }
}
