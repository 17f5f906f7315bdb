//! Hero actions and the reactions a hero drives
//!
//! Heroes dominate every contact they are part of, so destination arrivals,
//! goodie collection and obstacle callbacks are all triggered from here.

use std::f32::consts::FRAC_PI_2;

use super::score::Outcome;
use super::stage::Stage;
use super::state::{ActorId, ContactInfo, Hero};

/// Body rotation of a crawling hero
const CRAWL_ROTATION: f32 = -FRAC_PI_2;

impl Stage {
    pub fn hero(&self, id: ActorId) -> Option<&Hero> {
        self.actor(id).and_then(|a| a.hero())
    }

    fn hero_mut(&mut self, id: ActorId) -> Option<&mut Hero> {
        self.actor_mut(id).and_then(|a| a.hero_mut())
    }

    // === Actions ===

    /// Set a hero's strength and fire its strength-change callback
    pub fn set_strength(&mut self, id: ActorId, strength: i32) {
        let Some(hero) = self.hero_mut(id) else {
            return;
        };
        hero.strength = strength;
        let callback = hero.strength_change_callback.as_ref().map(|h| h.get());
        log::debug!("{:?} strength now {}", id, strength);
        if let Some(callback) = callback {
            callback(self, id);
        }
    }

    /// Grant (more) seconds of invincibility
    pub fn make_invincible(&mut self, id: ActorId, seconds: f32) {
        if let Some(hero) = self.hero_mut(id) {
            hero.invincible_remaining = (hero.invincible_remaining + seconds).max(0.0);
        }
    }

    /// Jump if allowed. Breaks any sticky link first.
    pub fn jump(&mut self, id: ActorId) -> bool {
        let Some(actor) = self.actor(id) else {
            return false;
        };
        let Some(hero) = actor.hero() else {
            return false;
        };
        if !actor.enabled || (hero.in_air && !hero.multi_jump) {
            return false;
        }
        let body = actor.body;
        let impulse = hero.jump_impulse;
        let spin = hero.jump_rotation;
        let sound = hero.jump_sound.clone();

        self.unstick(id);
        let velocity = self.world.velocity(body);
        self.world.set_velocity(body, velocity + impulse);
        if let Some(spin) = spin {
            self.world.set_angular_velocity(body, spin);
        }
        if let Some(hero) = self.hero_mut(id) {
            hero.in_air = true;
        }
        self.play(sound.as_deref());
        true
    }

    pub fn crawl_on(&mut self, id: ActorId) {
        self.set_crawl(id, true);
    }

    pub fn crawl_off(&mut self, id: ActorId) {
        self.set_crawl(id, false);
    }

    fn set_crawl(&mut self, id: ActorId, crawling: bool) {
        let Some(actor) = self.actor_mut(id) else {
            return;
        };
        let body = actor.body;
        let Some(hero) = actor.hero_mut() else {
            return;
        };
        if hero.crawling == crawling {
            return;
        }
        hero.crawling = crawling;
        let rotation = if crawling { CRAWL_ROTATION } else { 0.0 };
        self.world.set_rotation(body, rotation);
    }

    /// Remove a hero for good. The level is lost if the hero had to survive
    /// or no hero is left.
    pub fn defeat_hero(&mut self, hero: ActorId, by_enemy: Option<ActorId>) {
        let Some(must_survive) = self.hero(hero).map(|h| h.must_survive) else {
            return;
        };
        if !self.is_enabled(hero) {
            return;
        }
        self.remove_actor(hero, false);
        let outcome = self.score.on_hero_defeated();
        log::debug!("{:?} defeated by {:?}", hero, by_enemy);

        let callback = by_enemy
            .and_then(|e| self.actor(e))
            .and_then(|a| a.enemy())
            .and_then(|e| e.on_defeat_hero.as_ref())
            .map(|h| h.get());
        if let (Some(callback), Some(enemy)) = (callback, by_enemy) {
            callback(self, enemy, hero);
        }

        if must_survive {
            self.end_level(Outcome::Lost);
        } else {
            self.signal(outcome);
        }
    }

    /// Try to let a hero into a destination. On success the hero is removed
    /// quietly; on rejection nothing changes.
    pub fn receive(&mut self, destination: ActorId, hero: ActorId) -> bool {
        let (Some(d), Some(h)) = (self.actor(destination), self.actor(hero)) else {
            return false;
        };
        if !d.enabled || !h.enabled || h.hero().is_none() {
            return false;
        }
        let Some(dest) = d.destination() else {
            return false;
        };
        if !dest.has_room() {
            log::debug!("{:?} is full, {:?} turned away", destination, hero);
            return false;
        }
        let sound = dest.arrival_sound.clone();
        if let Some(attempt) = dest.on_attempt_arrival.as_ref().map(|h| h.get()) {
            if !attempt(self, destination, hero) {
                return false;
            }
        }

        self.remove_actor(hero, true);
        if let Some(dest) = self.actor_mut(destination).and_then(|a| a.destination_mut()) {
            dest.holding += 1;
        }
        self.play(sound.as_deref());
        let outcome = self.score.on_destination_arrive();
        self.signal(outcome);
        true
    }

    // === Reactions ===

    pub(super) fn hero_meets_enemy(&mut self, hero_id: ActorId, enemy_id: ActorId) {
        let (Some(h), Some(e)) = (self.actor(hero_id), self.actor(enemy_id)) else {
            return;
        };
        let (Some(hero), Some(enemy)) = (h.hero(), e.enemy()) else {
            return;
        };

        if enemy.always_does_damage {
            self.defeat_hero(hero_id, Some(enemy_id));
            return;
        }

        if hero.is_invincible() {
            if !enemy.immune_to_invincibility {
                self.defeat_enemy(enemy_id, true, Some(hero_id));
            }
            return;
        }

        let hero_bottom = self.world.bounds(h.body).map_or(f32::MIN, |(min, _)| min.y);
        let enemy_center = self.world.position(e.body).y;
        let stomped = hero.in_air && enemy.defeat_by_jump && hero_bottom > enemy_center;
        if (hero.crawling && enemy.defeat_by_crawl) || stomped {
            self.defeat_enemy(enemy_id, true, Some(hero_id));
            return;
        }

        if enemy.damage >= hero.strength {
            self.defeat_hero(hero_id, Some(enemy_id));
            return;
        }

        let strength = hero.strength - enemy.damage;
        self.set_strength(hero_id, strength);
        self.defeat_enemy(enemy_id, true, Some(hero_id));
    }

    pub(super) fn hero_meets_obstacle(
        &mut self,
        hero_id: ActorId,
        obstacle_id: ActorId,
        info: &ContactInfo,
    ) {
        let now = self.now;
        let default_delay = self.settings.collide_sound_delay;
        let Some(obstacle) = self.actor_mut(obstacle_id).and_then(|a| a.obstacle_mut()) else {
            return;
        };
        let sound = match &obstacle.collide_sound {
            Some(sound) if obstacle.collide_sound_ready(now, default_delay) => {
                obstacle.last_collide_sound = Some(now);
                Some(sound.clone())
            }
            _ => None,
        };
        let callback = obstacle.hero_collision.as_ref().map(|h| h.get());
        let reenable_jump = !info.sensor && !obstacle.no_jump_reenable;
        self.play(sound.as_deref());

        if !info.sensor {
            self.reset_jump_rotation(hero_id);
        }

        if let Some(callback) = callback {
            callback(self, obstacle_id, hero_id, info);
        }

        if reenable_jump {
            if let Some(hero) = self.hero_mut(hero_id) {
                hero.in_air = false;
            }
        }
    }

    fn reset_jump_rotation(&mut self, hero_id: ActorId) {
        let Some(actor) = self.actor(hero_id) else {
            return;
        };
        let Some(hero) = actor.hero() else {
            return;
        };
        if hero.jump_rotation.is_none() {
            return;
        }
        let rest = if hero.crawling { CRAWL_ROTATION } else { 0.0 };
        let body = actor.body;
        self.world.set_angular_velocity(body, 0.0);
        self.world.set_rotation(body, rest);
    }

    pub(super) fn hero_meets_goodie(&mut self, hero_id: ActorId, goodie_id: ActorId) {
        let Some(goodie) = self.actor(goodie_id).and_then(|a| a.goodie()).cloned() else {
            return;
        };
        self.remove_actor(goodie_id, true);

        if let Some(callback) = goodie.on_hero_collect.as_ref().map(|h| h.get()) {
            callback(self, goodie_id, hero_id);
        }
        if goodie.strength_boost != 0 {
            if let Some(strength) = self.hero(hero_id).map(|h| h.strength) {
                self.set_strength(hero_id, strength + goodie.strength_boost);
            }
        }
        if goodie.invincibility > 0.0 {
            self.make_invincible(hero_id, goodie.invincibility);
        }

        let outcome = self.score.on_goodie_collected(goodie.score);
        self.signal(outcome);
    }
}
