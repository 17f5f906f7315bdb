//! Enemy defeat and the reactions an enemy drives

use super::stage::Stage;
use super::state::{ActorId, ContactInfo, Enemy};

impl Stage {
    pub fn enemy(&self, id: ActorId) -> Option<&Enemy> {
        self.actor(id).and_then(|a| a.enemy())
    }

    /// Remove an enemy with its disappearance effect. `increase_score`
    /// counts it toward the defeated total; `by_hero` is handed to the
    /// enemy's defeat callback and is `None` when no hero was involved.
    pub fn defeat_enemy(&mut self, id: ActorId, increase_score: bool, by_hero: Option<ActorId>) {
        let Some(callback) = self
            .actor(id)
            .filter(|a| a.enabled)
            .and_then(|a| a.enemy())
            .map(|e| e.on_defeated.as_ref().map(|h| h.get()))
        else {
            return;
        };
        self.remove_actor(id, false);
        log::debug!("{:?} defeated by {:?}", id, by_hero);

        if increase_score {
            let outcome = self.score.on_enemy_defeated();
            self.signal(outcome);
        }
        if let Some(callback) = callback {
            callback(self, id, by_hero);
        }
    }

    pub(super) fn enemy_meets_obstacle(
        &mut self,
        enemy_id: ActorId,
        obstacle_id: ActorId,
        info: &ContactInfo,
    ) {
        let callback = self
            .actor(obstacle_id)
            .and_then(|a| a.obstacle())
            .and_then(|o| o.enemy_collision.as_ref())
            .map(|h| h.get());
        if let Some(callback) = callback {
            callback(self, obstacle_id, enemy_id, info);
        }
    }

    /// Each hit wears the enemy's damage down by the projectile's damage;
    /// an enemy worn down to nothing is defeated.
    pub(super) fn enemy_meets_projectile(&mut self, enemy_id: ActorId, projectile_id: ActorId) {
        let Some(hit) = self
            .actor(projectile_id)
            .filter(|a| a.enabled)
            .and_then(|a| a.projectile())
            .map(|p| p.damage)
        else {
            return;
        };
        let Some(enemy) = self.actor_mut(enemy_id).and_then(|a| a.enemy_mut()) else {
            return;
        };
        enemy.damage -= hit;
        let left = enemy.damage;
        log::debug!("{:?} hit for {}, {} left", enemy_id, hit, left);

        if left <= 0 {
            self.reclaim_projectile(projectile_id, true);
            self.defeat_enemy(enemy_id, true, None);
        } else {
            self.reclaim_projectile(projectile_id, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::audio::Silence;
    use crate::physics::BodyDesc;
    use crate::settings::StageSettings;
    use crate::sim::score::{EnemyGoal, Outcome};
    use crate::sim::stage::Stage;
    use crate::sim::state::{ActorId, ContactInfo, Enemy, Obstacle};

    fn stage() -> Stage {
        Stage::new(StageSettings::default(), Silence)
    }

    #[test]
    fn test_defeat_runs_callback_once() {
        let mut stage = stage();
        let seen: Rc<RefCell<Vec<Option<ActorId>>>> = Rc::default();
        let log = Rc::clone(&seen);
        let enemy = stage.add_enemy(
            &BodyDesc::fixed(1.0, 1.0),
            Enemy::default().on_defeated(move |_, _, by| log.borrow_mut().push(by)),
        );
        stage.defeat_enemy(enemy, true, Some(ActorId(42)));
        stage.defeat_enemy(enemy, true, None);
        assert_eq!(*seen.borrow(), vec![Some(ActorId(42))]);
        assert_eq!(stage.score().state().enemies_defeated, 1);
    }

    #[test]
    fn test_defeat_without_score_does_not_count() {
        let mut stage = stage();
        stage.score_mut().set_victory_enemy_count(EnemyGoal::All);
        let enemy = stage.add_enemy(&BodyDesc::fixed(1.0, 1.0), Enemy::default());
        stage.defeat_enemy(enemy, false, None);
        assert!(!stage.is_enabled(enemy));
        assert_eq!(stage.score().state().enemies_defeated, 0);
        assert_eq!(stage.outcome(), None);
    }

    #[test]
    fn test_last_enemy_wins_enemy_count_level() {
        let mut stage = stage();
        stage.score_mut().set_victory_enemy_count(EnemyGoal::All);
        let a = stage.add_enemy(&BodyDesc::fixed(1.0, 1.0), Enemy::default());
        let b = stage.add_enemy(&BodyDesc::fixed(1.0, 1.0).at(3.0, 0.0), Enemy::default());
        stage.defeat_enemy(a, true, None);
        assert_eq!(stage.outcome(), None);
        stage.defeat_enemy(b, true, None);
        assert_eq!(stage.outcome(), Some(Outcome::Won));
    }

    #[test]
    fn test_obstacle_decides_enemy_fate() {
        let mut stage = stage();
        let enemy = stage.add_enemy(&BodyDesc::dynamic(1.0, 1.0), Enemy::default());
        let lava = stage.add_obstacle(
            &BodyDesc::fixed(4.0, 1.0),
            Obstacle::default().on_enemy_collision(|s, _, enemy, _| {
                s.defeat_enemy(enemy, true, None);
            }),
        );
        stage.enemy_meets_obstacle(enemy, lava, &ContactInfo::none());
        assert!(!stage.is_enabled(enemy));
    }
}
