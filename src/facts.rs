//! Scalar facts that outlive a single stage
//!
//! Three scopes, from shortest to longest lived:
//! - level: cleared whenever a level is (re)entered
//! - session: kept for the life of the process
//! - game: persisted to a JSON file

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Fact store
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Facts {
    #[serde(skip)]
    level: BTreeMap<String, i64>,
    #[serde(skip)]
    session: BTreeMap<String, i64>,
    game: BTreeMap<String, i64>,
}

impl Facts {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every level fact (call on level entry)
    pub fn reset_level(&mut self) {
        self.level.clear();
    }

    pub fn level(&self, key: &str, default: i64) -> i64 {
        self.level.get(key).copied().unwrap_or(default)
    }

    pub fn put_level(&mut self, key: &str, value: i64) {
        self.level.insert(key.to_string(), value);
    }

    /// Add `delta` to a level fact (missing facts start at 0) and return the new value
    pub fn bump_level(&mut self, key: &str, delta: i64) -> i64 {
        let entry = self.level.entry(key.to_string()).or_insert(0);
        *entry += delta;
        *entry
    }

    pub fn session(&self, key: &str, default: i64) -> i64 {
        self.session.get(key).copied().unwrap_or(default)
    }

    pub fn put_session(&mut self, key: &str, value: i64) {
        self.session.insert(key.to_string(), value);
    }

    pub fn game(&self, key: &str, default: i64) -> i64 {
        self.game.get(key).copied().unwrap_or(default)
    }

    pub fn put_game(&mut self, key: &str, value: i64) {
        self.game.insert(key.to_string(), value);
    }

    /// Keep the larger of the stored game fact and `value`.
    /// Returns true if `value` became the new record.
    pub fn put_game_best(&mut self, key: &str, value: i64) -> bool {
        match self.game.get(key) {
            Some(&best) if best >= value => false,
            _ => {
                self.game.insert(key.to_string(), value);
                true
            }
        }
    }

    /// Load game facts from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let json = fs::read_to_string(path)?;
        let facts: Facts = serde_json::from_str(&json)?;
        log::info!("Loaded {} game facts", facts.game.len());
        Ok(facts)
    }

    /// Load game facts, starting fresh if the file is missing or unreadable
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(facts) => facts,
            Err(e) => {
                log::info!("No game facts found, starting fresh ({})", e);
                Self::new()
            }
        }
    }

    /// Save game facts (level and session facts are never written)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        log::info!("Game facts saved ({} entries)", self.game.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_are_independent() {
        let mut facts = Facts::new();
        facts.put_level("keys", 2);
        facts.put_session("keys", 5);
        facts.put_game("keys", 9);
        assert_eq!(facts.level("keys", 0), 2);
        assert_eq!(facts.session("keys", 0), 5);
        assert_eq!(facts.game("keys", 0), 9);

        facts.reset_level();
        assert_eq!(facts.level("keys", -1), -1);
        assert_eq!(facts.session("keys", 0), 5);
    }

    #[test]
    fn test_bump_level() {
        let mut facts = Facts::new();
        assert_eq!(facts.bump_level("coins", 3), 3);
        assert_eq!(facts.bump_level("coins", -1), 2);
    }

    #[test]
    fn test_put_game_best() {
        let mut facts = Facts::new();
        assert!(facts.put_game_best("best", 10));
        assert!(!facts.put_game_best("best", 5));
        assert!(!facts.put_game_best("best", 10));
        assert!(facts.put_game_best("best", 11));
        assert_eq!(facts.game("best", 0), 11);
    }

    #[test]
    fn test_only_game_facts_are_serialized() {
        let mut facts = Facts::new();
        facts.put_level("temp", 1);
        facts.put_session("temp", 1);
        facts.put_game("kept", 7);
        let json = serde_json::to_string(&facts).expect("serializable");
        let back: Facts = serde_json::from_str(&json).expect("valid json");
        assert_eq!(back.game("kept", 0), 7);
        assert_eq!(back.level("temp", 0), 0);
        assert_eq!(back.session("temp", 0), 0);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("arcade_facts_{}.json", std::process::id()));
        let mut facts = Facts::new();
        facts.put_game("levels_won", 4);
        facts.save(&path).expect("writable temp dir");
        let loaded = Facts::load(&path).expect("just written");
        assert_eq!(loaded.game("levels_won", 0), 4);
        let _ = std::fs::remove_file(&path);
    }
}
