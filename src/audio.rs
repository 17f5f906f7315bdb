//! Sound effect collaborator
//!
//! The stage only ever says "play this named sound now". How (and whether)
//! it is heard is up to the backend: the binary logs, tests record.

use std::cell::RefCell;
use std::rc::Rc;

use crate::settings::StageSettings;

/// Anything the stage can hand a sound name to
pub trait SoundPlayer {
    /// Fire-and-forget playback
    fn play(&mut self, name: &str);
}

/// Where mixed sounds end up
pub trait SoundBackend {
    fn emit(&mut self, name: &str, volume: f32);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl SoundPlayer for Silence {
    fn play(&mut self, _name: &str) {}
}

/// Writes every sound to the log at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBackend;

impl SoundBackend for LogBackend {
    fn emit(&mut self, name: &str, volume: f32) {
        log::debug!("sound {} @ {:.2}", name, volume);
    }
}

/// Records played sounds; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct SoundLog {
    played: Rc<RefCell<Vec<(String, f32)>>>,
}

impl SoundLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names played so far, oldest first
    pub fn names(&self) -> Vec<String> {
        self.played.borrow().iter().map(|(n, _)| n.clone()).collect()
    }

    /// How many times `name` was played
    pub fn count(&self, name: &str) -> usize {
        self.played.borrow().iter().filter(|(n, _)| n == name).count()
    }

    pub fn clear(&self) {
        self.played.borrow_mut().clear();
    }
}

impl SoundBackend for SoundLog {
    fn emit(&mut self, name: &str, volume: f32) {
        self.played.borrow_mut().push((name.to_string(), volume));
    }
}

/// Volume/mute front end over a backend
pub struct AudioManager<B: SoundBackend> {
    backend: B,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl<B: SoundBackend> AudioManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    /// Take volumes and mute state from stage settings
    pub fn from_settings(backend: B, settings: &StageSettings) -> Self {
        let mut manager = Self::new(backend);
        manager.set_master_volume(settings.master_volume);
        manager.set_sfx_volume(settings.sfx_volume);
        manager.set_muted(settings.muted);
        manager
    }

    /// Clamped to 0..=1
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Master times effects volume, zero while muted
    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }
}

impl<B: SoundBackend> SoundPlayer for AudioManager<B> {
    fn play(&mut self, name: &str) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        self.backend.emit(name, vol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_muted_manager_plays_nothing() {
        let log = SoundLog::new();
        let mut audio = AudioManager::new(log.clone());
        audio.play("boing");
        audio.set_muted(true);
        audio.play("boing");
        assert_eq!(log.count("boing"), 1);
    }

    #[test]
    fn test_volume_is_product_and_clamped() {
        let log = SoundLog::new();
        let mut audio = AudioManager::new(log.clone());
        audio.set_master_volume(2.0);
        audio.set_sfx_volume(0.5);
        audio.play("ding");
        let (_, vol) = log.played.borrow()[0].clone();
        assert!((vol - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_volume_from_settings_is_silent() {
        let log = SoundLog::new();
        let settings = StageSettings {
            sfx_volume: 0.0,
            ..Default::default()
        };
        let mut audio = AudioManager::from_settings(log.clone(), &settings);
        audio.play("ding");
        assert!(log.names().is_empty());
    }
}
