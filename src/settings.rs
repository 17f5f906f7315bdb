//! Stage settings
//!
//! Loaded from a JSON file next to the game; every field has a default so a
//! partial file (or none at all) is fine.

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::StoreError;

/// How rendered frames map onto fixed physics steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StepPolicy {
    /// Exactly one fixed step per frame, whatever the real frame time was.
    /// Simulation time drifts behind wall-clock time on slow frames.
    #[default]
    Fixed,
    /// Accumulate real frame time and run as many fixed steps as fit,
    /// capped at `max_substeps` per frame to prevent a spiral of death.
    CatchUp { max_substeps: u32 },
}

impl StepPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepPolicy::Fixed => "fixed",
            StepPolicy::CatchUp { .. } => "catch-up",
        }
    }

    /// Parse a policy name; `catch-up` uses the default substep cap
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fixed" => Some(StepPolicy::Fixed),
            "catch-up" | "catchup" => Some(StepPolicy::CatchUp {
                max_substeps: MAX_SUBSTEPS,
            }),
            _ => None,
        }
    }
}

/// Per-stage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    /// World gravity (y is up)
    pub gravity: Vec2,
    /// Length of one physics step in seconds
    pub substep: f32,
    pub step_policy: StepPolicy,

    // === Contact policy ===
    /// Re-engage delay given to actors that don't set their own
    pub stick_delay: f32,
    /// Minimum seconds between two collide sounds of one obstacle
    pub collide_sound_delay: f32,

    // === Audio ===
    pub master_volume: f32,
    pub sfx_volume: f32,
    pub muted: bool,
    /// Played once when the level is won
    pub win_sound: Option<String>,
    /// Played once when the level is lost
    pub lose_sound: Option<String>,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            substep: SIM_DT,
            step_policy: StepPolicy::Fixed,

            stick_delay: DEFAULT_STICK_DELAY,
            collide_sound_delay: DEFAULT_COLLIDE_SOUND_DELAY,

            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            win_sound: None,
            lose_sound: None,
        }
    }
}

impl StageSettings {
    /// Parse settings from JSON text
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    /// Replace a non-finite substep with the default and raise a tiny or
    /// negative one to [`MIN_SUBSTEP`]
    pub fn sanitized(mut self) -> Self {
        if !self.substep.is_finite() {
            log::warn!("Substep {} is not finite, using {:.4}s", self.substep, SIM_DT);
            self.substep = SIM_DT;
        } else if self.substep < MIN_SUBSTEP {
            log::warn!("Substep {} too short, using {:.4}s", self.substep, MIN_SUBSTEP);
            self.substep = MIN_SUBSTEP;
        }
        self
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load settings, falling back to defaults if the file is missing or bad
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded stage settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Using default stage settings ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
