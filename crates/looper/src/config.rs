//! Loop controller configuration.
//!
//! Every interval and tolerance the controller uses lives here so hosts can
//! tune them without touching the state machine.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::correction::Tolerances;
use crate::error::ConfigError;
use crate::region::MIN_SPAN_SECS;

/// A quick-select region button on the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub label: String,
    pub start: f64,
    /// `None` means "until the end of the media".
    pub end: Option<f64>,
}

impl Preset {
    pub fn new(label: &str, start: f64, end: Option<f64>) -> Self {
        Self {
            label: label.to_string(),
            start,
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Seek back once playback is this close to the loop end.
    pub boundary_tolerance_secs: f64,
    /// Positions further than this before the loop start count as a scrub.
    pub scrub_tolerance_secs: f64,
    /// Enforcement timer period.
    pub enforce_period_ms: u64,
    /// How often the injected panel's presence is checked.
    pub reconcile_period_ms: u64,
    /// Autosave period while looping is enabled.
    pub heartbeat_period_ms: u64,
    /// Playhead refresh period on the panel.
    pub playhead_period_ms: u64,
    /// Persisted records older than this are evicted.
    pub ttl_days: u64,
    /// Storage key prefix; records live under `<namespace>-<videoId>`.
    pub namespace: String,
    /// Step used by the panel's nudge buttons.
    pub nudge_step_secs: f64,
    /// Minimum distance kept between the two slider handles.
    pub handle_gap_secs: f64,
    pub presets: Vec<Preset>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            boundary_tolerance_secs: 0.08,
            scrub_tolerance_secs: 0.3,
            enforce_period_ms: 30,
            reconcile_period_ms: 3000,
            heartbeat_period_ms: 5000,
            playhead_period_ms: 100,
            ttl_days: 7,
            namespace: "yt-rapper-loop".to_string(),
            nudge_step_secs: 0.5,
            handle_gap_secs: 1.0,
            presets: vec![
                Preset::new("Intro (0:00 - 0:15)", 0.0, Some(15.0)),
                Preset::new("Verse 1 (0:15 - 1:00)", 15.0, Some(60.0)),
                Preset::new("Hook (1:00 - 1:30)", 60.0, Some(90.0)),
                Preset::new("Full Beat", 0.0, None),
            ],
        }
    }
}

impl LoopConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: LoopConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("enforce_period_ms", self.enforce_period_ms),
            ("reconcile_period_ms", self.reconcile_period_ms),
            ("heartbeat_period_ms", self.heartbeat_period_ms),
            ("playhead_period_ms", self.playhead_period_ms),
        ];
        for (field, value) in periods {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "period must be positive".to_string(),
                });
            }
        }

        let non_negative = [
            ("boundary_tolerance_secs", self.boundary_tolerance_secs),
            ("scrub_tolerance_secs", self.scrub_tolerance_secs),
            ("nudge_step_secs", self.nudge_step_secs),
            ("handle_gap_secs", self.handle_gap_secs),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("expected a non-negative number, got {}", value),
                });
            }
        }

        // A tolerance as wide as the shortest region puts `start` inside the
        // seek-back window and the correction would fire on every tick.
        if self.boundary_tolerance_secs >= MIN_SPAN_SECS {
            return Err(ConfigError::Invalid {
                field: "boundary_tolerance_secs",
                reason: format!(
                    "must be below the minimum loop length of {}s, got {}",
                    MIN_SPAN_SECS, self.boundary_tolerance_secs
                ),
            });
        }

        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "namespace",
                reason: "namespace must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            boundary: self.boundary_tolerance_secs,
            scrub: self.scrub_tolerance_secs,
        }
    }

    pub fn enforce_period(&self) -> Duration {
        Duration::from_millis(self.enforce_period_ms)
    }

    pub fn reconcile_period(&self) -> Duration {
        Duration::from_millis(self.reconcile_period_ms)
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.heartbeat_period_ms)
    }

    pub fn playhead_period(&self) -> Duration {
        Duration::from_millis(self.playhead_period_ms)
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_days * 24 * 60 * 60 * 1000
    }
}
