//! Simulation settings
//!
//! Persisted as JSON next to the track data. Missing fields take their
//! default values, so older files keep loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{COLLISION_COOLDOWN, FALLBACK_INTERVAL, MAX_INTERVAL};
use crate::error::Result;

/// Frame-stepping and collision tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Longest interval accepted by `next_frame` (seconds)
    pub max_interval: f64,
    /// Interval used instead of one longer than `max_interval`
    pub fallback_interval: f64,
    /// How long a pair stays suppressed after colliding (seconds)
    pub collision_cooldown: f64,
    /// Run the swept tunneling test for fast bodies
    pub swept_checks: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            max_interval: MAX_INTERVAL,
            fallback_interval: FALLBACK_INTERVAL,
            collision_cooldown: COLLISION_COOLDOWN,
            swept_checks: true,
        }
    }
}

impl SimSettings {
    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return settings;
                }
                Err(e) => log::warn!("Ignoring malformed settings {}: {e}", path.display()),
            },
            Err(e) => log::warn!("Cannot read settings {}: {e}", path.display()),
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Interval actually simulated for a requested frame interval
    ///
    /// Hitches and NaN fall back to `fallback_interval`; negatives become zero.
    pub fn clamp_interval(&self, interval: f64) -> f64 {
        if interval > self.max_interval || interval.is_nan() {
            log::debug!(
                "Clamping frame interval {interval:.4}s to {:.4}s",
                self.fallback_interval
            );
            self.fallback_interval
        } else {
            interval.max(0.0)
        }
    }
}
