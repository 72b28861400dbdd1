//! Enforcement engine: keeps playback inside the loop region.
//!
//! While enforcing, two independent triggers drive the same correction rule:
//! the media element's position notification and a fixed-period timer. The
//! engine owns both subscriptions and the timer, and tears all of them down
//! on detach so nothing fires afterwards.

use std::time::Duration;

use tracing::{debug, info};

use crate::correction::{correct, correct_ended, Correction, Tolerances};
use crate::host::{HostPage, ListenerId, MediaEventKind, MediaHandle, TimerId};
use crate::region::LoopRegion;

/// Where an enforcement tick came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Tick,
    TimeUpdate,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerOutcome {
    /// Not enforcing, or playback is already inside the region.
    Idle,
    Corrected(Correction),
    /// The media element went away; the engine detached itself.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnforcementState {
    Detached,
    Enforcing {
        media: MediaHandle,
        time_listener: ListenerId,
        ended_listener: ListenerId,
        timer: TimerId,
    },
}

#[derive(Debug)]
pub struct EnforcementEngine {
    state: EnforcementState,
    period: Duration,
    tolerances: Tolerances,
}

impl EnforcementEngine {
    pub fn new(period: Duration, tolerances: Tolerances) -> Self {
        Self {
            state: EnforcementState::Detached,
            period,
            tolerances,
        }
    }

    pub fn is_enforcing(&self) -> bool {
        matches!(self.state, EnforcementState::Enforcing { .. })
    }

    pub fn media(&self) -> Option<MediaHandle> {
        match self.state {
            EnforcementState::Enforcing { media, .. } => Some(media),
            EnforcementState::Detached => None,
        }
    }

    /// Subscribe to `media` and start the tick timer. Any previous
    /// subscription is released first.
    pub fn attach(&mut self, host: &mut dyn HostPage, media: MediaHandle) {
        self.detach(host);
        let time_listener = host.add_listener(media, MediaEventKind::TimeUpdate);
        let ended_listener = host.add_listener(media, MediaEventKind::Ended);
        let timer = host.set_interval(self.period);
        self.state = EnforcementState::Enforcing {
            media,
            time_listener,
            ended_listener,
            timer,
        };
        info!(media = media.0, period_ms = self.period.as_millis() as u64, "enforcement attached");
    }

    /// Unregister both subscriptions and the timer. No-op when detached.
    pub fn detach(&mut self, host: &mut dyn HostPage) {
        if let EnforcementState::Enforcing {
            media,
            time_listener,
            ended_listener,
            timer,
        } = self.state
        {
            host.remove_listener(time_listener);
            host.remove_listener(ended_listener);
            host.clear_interval(timer);
            self.state = EnforcementState::Detached;
            info!(media = media.0, "enforcement detached");
        }
    }

    /// The trigger `timer` stands for, if it is ours.
    pub fn timer_trigger(&self, timer: TimerId) -> Option<Trigger> {
        match self.state {
            EnforcementState::Enforcing { timer: own, .. } if own == timer => Some(Trigger::Tick),
            _ => None,
        }
    }

    /// The trigger `listener` stands for, if it is ours.
    pub fn listener_trigger(&self, listener: ListenerId) -> Option<Trigger> {
        match self.state {
            EnforcementState::Enforcing {
                time_listener,
                ended_listener,
                ..
            } => {
                if listener == time_listener {
                    Some(Trigger::TimeUpdate)
                } else if listener == ended_listener {
                    Some(Trigger::Ended)
                } else {
                    None
                }
            }
            EnforcementState::Detached => None,
        }
    }

    /// Run the correction rule for one trigger and apply its result.
    pub fn on_trigger(
        &mut self,
        host: &mut dyn HostPage,
        trigger: Trigger,
        region: &LoopRegion,
    ) -> TriggerOutcome {
        let media = match self.state {
            EnforcementState::Enforcing { media, .. } => media,
            EnforcementState::Detached => return TriggerOutcome::Idle,
        };
        if !host.is_connected(media) {
            debug!(media = media.0, ?trigger, "media detached under enforcement");
            self.detach(host);
            return TriggerOutcome::Stale;
        }
        let Some(element) = host.media_mut(media) else {
            self.detach(host);
            return TriggerOutcome::Stale;
        };

        let correction = match trigger {
            Trigger::Ended => Some(correct_ended(region)),
            Trigger::Tick | Trigger::TimeUpdate => correct(
                element.current_time(),
                element.paused(),
                region,
                &self.tolerances,
            ),
        };
        match correction {
            Some(c) => {
                element.set_current_time(c.seek_to);
                if c.resume {
                    element.play();
                }
                debug!(?trigger, seek_to = c.seek_to, resume = c.resume, "loop correction");
                TriggerOutcome::Corrected(c)
            }
            None => TriggerOutcome::Idle,
        }
    }
}
