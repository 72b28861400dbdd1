//! The loop region model.
//!
//! Holds `[start, end]` plus the enabled flag, and the duration of the media
//! it is applied to. Every mutation re-clamps so that
//! `0 <= start < end <= duration` holds whenever `duration > 0`.

/// Smallest region the model will ever produce.
pub const MIN_SPAN_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRegion {
    start: f64,
    end: f64,
    enabled: bool,
    duration: f64,
}

fn clamp_secs(t: f64, duration: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, duration)
    }
}

impl LoopRegion {
    /// Full-length, disabled region.
    pub fn full(duration: f64) -> Self {
        let duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        };
        Self {
            start: 0.0,
            end: duration,
            enabled: false,
            duration,
        }
    }

    /// Seed from persisted bounds.
    ///
    /// A start past the duration falls back to 0; an end past the duration
    /// (or not after start) falls back to the duration.
    pub fn restored(start: f64, end: f64, enabled: bool, duration: f64) -> Self {
        let mut region = Self::full(duration);
        region.enabled = enabled;
        region.start = if start.is_finite() && start >= 0.0 && start <= region.duration {
            start
        } else {
            0.0
        };
        region.end = if end.is_finite() && end <= region.duration && end > region.start {
            end
        } else {
            region.duration
        };
        region.enforce_span();
        region
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `t` lies in `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    pub fn set_start(&mut self, t: f64) {
        let mut start = clamp_secs(t, self.duration);
        if start > self.end - MIN_SPAN_SECS {
            start = (self.end - MIN_SPAN_SECS).max(0.0);
        }
        self.start = start;
    }

    pub fn set_end(&mut self, t: f64) {
        let mut end = clamp_secs(t, self.duration);
        if end < self.start + MIN_SPAN_SECS {
            end = (self.start + MIN_SPAN_SECS).min(self.duration);
        }
        self.end = end;
    }

    /// Set both bounds at once, so a jump past the current end is not
    /// clamped against the old end.
    pub fn set_bounds(&mut self, start: f64, end: f64) {
        self.start = clamp_secs(start, self.duration);
        self.end = clamp_secs(end, self.duration);
        self.enforce_span();
    }

    /// Back to `[0, duration]`. Returns whether the loop was enabled, in
    /// which case it is now off.
    pub fn reset(&mut self) -> bool {
        let was_enabled = self.enabled;
        self.start = 0.0;
        self.end = self.duration;
        self.enabled = false;
        was_enabled
    }

    /// Flip the enabled flag and return the new value.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Re-clamp against a newly known duration (e.g. a re-resolved element).
    pub fn clamp_to(&mut self, duration: f64) {
        if !duration.is_finite() || duration <= 0.0 {
            return;
        }
        let restored = Self::restored(self.start, self.end, self.enabled, duration);
        *self = restored;
    }

    fn enforce_span(&mut self) {
        let d = self.duration;
        if self.end - self.start >= MIN_SPAN_SECS {
            return;
        }
        if self.start + MIN_SPAN_SECS <= d {
            self.end = self.start + MIN_SPAN_SECS;
        } else {
            self.end = d;
            self.start = (d - MIN_SPAN_SECS).max(0.0);
        }
    }
}
