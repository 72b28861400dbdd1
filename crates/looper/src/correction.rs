//! The loop correction rule.
//!
//! One pure function decides whether playback must be pulled back into the
//! region. Both enforcement triggers (timer tick and position notification)
//! call it, so it has to be idempotent: once the seek has been applied, the
//! same inputs produce no further action.

use crate::region::LoopRegion;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Pre-emptive margin before `end` at which the seek back happens.
    pub boundary: f64,
    /// Margin before `start` beyond which a position counts as a scrub.
    pub scrub: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            boundary: 0.08,
            scrub: 0.3,
        }
    }
}

/// What the media element should do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub seek_to: f64,
    pub resume: bool,
}

/// Decide the correction for `position`, or `None` when playback is fine.
pub fn correct(
    position: f64,
    paused: bool,
    region: &LoopRegion,
    tolerances: &Tolerances,
) -> Option<Correction> {
    if !position.is_finite() {
        return None;
    }
    if position >= region.end() - tolerances.boundary {
        Some(Correction {
            seek_to: region.start(),
            resume: paused,
        })
    } else if position < region.start() - tolerances.scrub {
        Some(Correction {
            seek_to: region.start(),
            resume: false,
        })
    } else {
        None
    }
}

/// The media reported it ended: always back to start and playing.
pub fn correct_ended(region: &LoopRegion) -> Correction {
    Correction {
        seek_to: region.start(),
        resume: true,
    }
}
