//! Score tracking and the win/lose state machine
//!
//! Every counter change that can end the level returns the outcome it
//! signals; the stage latches the first one.

use serde::{Deserialize, Serialize};

/// How the level ends in a win
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VictoryMode {
    /// Enough heroes reached destinations
    Destination { heroes: u32 },
    /// All four goodie counters reached their thresholds
    GoodieCount { thresholds: [i32; 4] },
    /// Enough enemies were defeated
    EnemyCount { goal: EnemyGoal },
}

impl Default for VictoryMode {
    fn default() -> Self {
        VictoryMode::Destination { heroes: 1 }
    }
}

/// Enemy-count victory target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyGoal {
    /// Every enemy created so far
    All,
    Count(u32),
}

/// Terminal result of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    Lost,
}

/// Counters and timers for the current level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    pub goodies: [i32; 4],
    pub enemies_created: u32,
    pub enemies_defeated: u32,
    pub heroes_created: u32,
    pub heroes_defeated: u32,
    pub destination_arrivals: u32,
    /// Seconds until the level is lost
    pub lose_countdown: Option<f32>,
    /// Seconds until the level is won
    pub win_countdown: Option<f32>,
    /// Seconds since the stopwatch started
    pub stopwatch: Option<f32>,
}

/// Victory mode plus score state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreTracker {
    mode: VictoryMode,
    state: ScoreState,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reinitialize everything for a level (re)entry
    pub fn reset(&mut self) {
        *self = Self::default();
        log::debug!("Score reset");
    }

    pub fn mode(&self) -> VictoryMode {
        self.mode
    }

    pub fn state(&self) -> &ScoreState {
        &self.state
    }

    // === Victory configuration ===

    pub fn set_victory_destination(&mut self, heroes: u32) {
        self.mode = VictoryMode::Destination { heroes };
    }

    pub fn set_victory_goodies(&mut self, v1: i32, v2: i32, v3: i32, v4: i32) {
        self.mode = VictoryMode::GoodieCount {
            thresholds: [v1, v2, v3, v4],
        };
    }

    pub fn set_victory_enemy_count(&mut self, goal: EnemyGoal) {
        self.mode = VictoryMode::EnemyCount { goal };
    }

    // === Counters ===

    pub fn on_destination_arrive(&mut self) -> Option<Outcome> {
        self.state.destination_arrivals += 1;
        match self.mode {
            VictoryMode::Destination { heroes } if self.state.destination_arrivals >= heroes => {
                Some(Outcome::Won)
            }
            _ => None,
        }
    }

    pub fn on_goodie_collected(&mut self, score: [i32; 4]) -> Option<Outcome> {
        for (counter, add) in self.state.goodies.iter_mut().zip(score) {
            *counter += add;
        }
        match self.mode {
            VictoryMode::GoodieCount { thresholds }
                if self
                    .state
                    .goodies
                    .iter()
                    .zip(thresholds)
                    .all(|(&have, need)| have >= need) =>
            {
                Some(Outcome::Won)
            }
            _ => None,
        }
    }

    pub fn on_enemy_created(&mut self) {
        self.state.enemies_created += 1;
    }

    pub fn on_enemy_defeated(&mut self) -> Option<Outcome> {
        self.state.enemies_defeated += 1;
        let defeated = self.state.enemies_defeated;
        match self.mode {
            VictoryMode::EnemyCount { goal: EnemyGoal::All }
                if defeated >= self.state.enemies_created =>
            {
                Some(Outcome::Won)
            }
            VictoryMode::EnemyCount {
                goal: EnemyGoal::Count(n),
            } if defeated >= n => Some(Outcome::Won),
            _ => None,
        }
    }

    pub fn on_hero_created(&mut self) {
        self.state.heroes_created += 1;
    }

    /// Counts a defeat; the level is lost once every created hero is gone
    pub fn on_hero_defeated(&mut self) -> Option<Outcome> {
        self.state.heroes_defeated += 1;
        (self.state.heroes_defeated >= self.state.heroes_created).then_some(Outcome::Lost)
    }

    // === Timers ===

    pub fn set_lose_countdown(&mut self, seconds: f32) {
        self.state.lose_countdown = Some(seconds);
    }

    pub fn set_win_countdown(&mut self, seconds: f32) {
        self.state.win_countdown = Some(seconds);
    }

    pub fn start_stopwatch(&mut self) {
        self.state.stopwatch = Some(0.0);
    }

    pub fn stopwatch(&self) -> Option<f32> {
        self.state.stopwatch
    }

    /// Advance every running timer. A countdown that reaches zero stops and
    /// signals; the lose countdown is checked first.
    pub fn advance(&mut self, dt: f32) -> Option<Outcome> {
        if let Some(watch) = self.state.stopwatch.as_mut() {
            *watch += dt;
        }

        let lose = tick_down(&mut self.state.lose_countdown, dt);
        let win = tick_down(&mut self.state.win_countdown, dt);
        if lose {
            Some(Outcome::Lost)
        } else if win {
            Some(Outcome::Won)
        } else {
            None
        }
    }
}

/// Returns true the one time the countdown crosses zero
fn tick_down(countdown: &mut Option<f32>, dt: f32) -> bool {
    let Some(remaining) = countdown.as_mut() else {
        return false;
    };
    *remaining -= dt;
    if *remaining <= 0.0 {
        *countdown = None;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_threshold() {
        let mut score = ScoreTracker::new();
        score.set_victory_destination(2);
        assert_eq!(score.on_destination_arrive(), None);
        assert_eq!(score.on_destination_arrive(), Some(Outcome::Won));
    }

    #[test]
    fn test_goodies_need_all_four() {
        let mut score = ScoreTracker::new();
        score.set_victory_goodies(2, 1, 0, 0);
        assert_eq!(score.on_goodie_collected([2, 0, 0, 0]), None);
        assert_eq!(score.on_goodie_collected([0, 1, 0, 0]), Some(Outcome::Won));
        assert_eq!(score.state().goodies, [2, 1, 0, 0]);
    }

    #[test]
    fn test_goodies_ignored_in_other_modes() {
        let mut score = ScoreTracker::new();
        assert_eq!(score.on_goodie_collected([100, 100, 100, 100]), None);
    }

    #[test]
    fn test_enemy_goal_all() {
        let mut score = ScoreTracker::new();
        score.set_victory_enemy_count(EnemyGoal::All);
        score.on_enemy_created();
        score.on_enemy_created();
        assert_eq!(score.on_enemy_defeated(), None);
        assert_eq!(score.on_enemy_defeated(), Some(Outcome::Won));
    }

    #[test]
    fn test_enemy_goal_count() {
        let mut score = ScoreTracker::new();
        score.set_victory_enemy_count(EnemyGoal::Count(1));
        for _ in 0..3 {
            score.on_enemy_created();
        }
        assert_eq!(score.on_enemy_defeated(), Some(Outcome::Won));
    }

    #[test]
    fn test_all_heroes_defeated_loses() {
        let mut score = ScoreTracker::new();
        score.on_hero_created();
        score.on_hero_created();
        assert_eq!(score.on_hero_defeated(), None);
        assert_eq!(score.on_hero_defeated(), Some(Outcome::Lost));
    }

    #[test]
    fn test_countdowns_fire_once_lose_first() {
        let mut score = ScoreTracker::new();
        score.set_lose_countdown(1.0);
        score.set_win_countdown(1.0);
        score.start_stopwatch();
        assert_eq!(score.advance(0.5), None);
        assert_eq!(score.advance(0.5), Some(Outcome::Lost));
        assert_eq!(score.advance(0.5), None);
        assert!((score.stopwatch().unwrap_or(0.0) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut score = ScoreTracker::new();
        score.set_victory_goodies(1, 1, 1, 1);
        score.on_goodie_collected([1, 0, 0, 0]);
        score.on_enemy_created();
        score.set_lose_countdown(3.0);
        score.reset();
        assert_eq!(score.state(), &ScoreState::default());
        assert_eq!(score.mode(), VictoryMode::Destination { heroes: 1 });
    }
}
