//! Projectile pool
//!
//! A fixed ring of projectile actors created up front. Throwing takes the
//! slot under the cursor; if that projectile is still in flight the throw is
//! skipped and the cursor stays put, so rapid fire can drop shots when the
//! ring wraps before earlier ones land.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::stage::{Stage, StageEvent};
use super::state::{Actor, ActorId, Projectile, Role};
use crate::consts::DEFAULT_PROJECTILE_RANGE;
use crate::heading;
use crate::physics::BodyDesc;

/// Where pooled projectiles wait while not in flight
const PARKING_SPOT: Vec2 = Vec2::new(-10_000.0, -10_000.0);

/// Shape and behaviour shared by every projectile of a pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub size: usize,
    pub width: f32,
    pub height: f32,
    pub damage: i32,
    pub range: f32,
    pub gravity_scale: f32,
    pub sensor: bool,
    pub disappear_on_collide: bool,
    /// Pass-through group given to every projectile (0 for none)
    pub pass_through: u32,
    /// Total throws allowed, unlimited when `None`
    pub shot_budget: Option<u32>,
    /// Rotate each projectile to face its direction of travel
    pub face_travel: bool,
    pub throw_sound: Option<String>,
    pub disappear_sound: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 8,
            width: 0.5,
            height: 0.5,
            damage: 1,
            range: DEFAULT_PROJECTILE_RANGE,
            gravity_scale: 0.0,
            sensor: false,
            disappear_on_collide: true,
            pass_through: 0,
            shot_budget: None,
            face_travel: false,
            throw_sound: None,
            disappear_sound: None,
        }
    }
}

/// How `throw_at` turns a target into a velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Aim {
    /// Fixed speed straight at the target
    FixedSpeed(f32),
    /// The launch-to-target vector scaled by a factor
    Dampened(f32),
}

impl Aim {
    pub fn velocity(self, from: Vec2, to: Vec2) -> Vec2 {
        let delta = to - from;
        match self {
            Aim::FixedSpeed(speed) => delta.normalize_or_zero() * speed,
            Aim::Dampened(factor) => delta * factor,
        }
    }
}

/// Ring of reusable projectile actors
#[derive(Debug, Clone)]
pub struct ProjectilePool {
    slots: Vec<ActorId>,
    next: usize,
    remaining: Option<u32>,
    face_travel: bool,
    throw_sound: Option<String>,
}

impl ProjectilePool {
    /// Capacity of the ring
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[ActorId] {
        &self.slots
    }

    /// Throws left, `None` when unlimited
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.slots.contains(&id)
    }

    /// Take the slot under the cursor if its projectile is free. A busy slot
    /// or an exhausted budget fails without moving the cursor.
    pub fn acquire(&mut self, actors: &[Actor]) -> Option<ActorId> {
        if self.remaining == Some(0) {
            return None;
        }
        let id = *self.slots.get(self.next)?;
        let busy = actors.get(id.0 as usize).is_none_or(|a| a.enabled);
        if busy {
            return None;
        }
        self.next = (self.next + 1) % self.capacity();
        Some(id)
    }

    fn spend_shot(&mut self) {
        if let Some(left) = self.remaining.as_mut() {
            *left = left.saturating_sub(1);
        }
    }
}

impl Stage {
    /// Create the level's projectile pool. Any previous pool is replaced;
    /// its projectiles stay parked.
    pub fn configure_projectiles(&mut self, config: &PoolConfig) {
        if let Some(old) = self.pool.take() {
            for id in old.slots {
                self.remove_actor(id, true);
            }
        }

        let mut desc = BodyDesc::dynamic(config.width, config.height)
            .at(PARKING_SPOT.x, PARKING_SPOT.y)
            .with_gravity_scale(config.gravity_scale)
            .with_ccd(true);
        if config.sensor {
            desc = desc.sensor();
        }

        let mut slots = Vec::with_capacity(config.size);
        for _ in 0..config.size {
            let id = self.add_actor(
                &desc,
                Role::Projectile(Projectile {
                    damage: config.damage,
                    range: config.range,
                    range_origin: PARKING_SPOT,
                    disappear_on_collide: config.disappear_on_collide,
                }),
            );
            if let Some(actor) = self.actor_mut(id) {
                actor.traits.pass_through = config.pass_through;
                actor.disappear_sound = config.disappear_sound.clone();
            }
            self.remove_actor(id, true);
            slots.push(id);
        }

        log::info!(
            "Projectile pool ready: {} slots, budget {:?}",
            config.size,
            config.shot_budget
        );
        self.pool = Some(ProjectilePool {
            slots,
            next: 0,
            remaining: config.shot_budget,
            face_travel: config.face_travel,
            throw_sound: config.throw_sound.clone(),
        });
    }

    pub fn pool(&self) -> Option<&ProjectilePool> {
        self.pool.as_ref()
    }

    /// Throw from `thrower + offset` with a fixed velocity.
    /// Returns the projectile, or `None` if the throw was skipped.
    pub fn throw_fixed(&mut self, thrower: ActorId, offset: Vec2, velocity: Vec2) -> Option<ActorId> {
        let start = self.position(thrower) + offset;
        self.launch(thrower, start, velocity)
    }

    /// Throw from `thrower + offset` toward a world point
    pub fn throw_at(
        &mut self,
        thrower: ActorId,
        target: Vec2,
        offset: Vec2,
        aim: Aim,
    ) -> Option<ActorId> {
        let start = self.position(thrower) + offset;
        self.launch(thrower, start, aim.velocity(start, target))
    }

    fn launch(&mut self, thrower: ActorId, start: Vec2, velocity: Vec2) -> Option<ActorId> {
        let pool = self.pool.as_mut()?;
        let Some(id) = pool.acquire(&self.actors) else {
            log::debug!("Throw by {:?} skipped, no free projectile", thrower);
            return None;
        };
        pool.spend_shot();
        let face_travel = pool.face_travel;
        let sound = pool.throw_sound.clone();

        let actor = self.actors.get_mut(id.0 as usize)?;
        let body = actor.body;
        actor.enabled = true;
        if let Some(p) = actor.projectile_mut() {
            p.range_origin = start;
        }

        self.world.set_position(body, start);
        self.world.set_velocity(body, velocity);
        self.world.set_enabled(body, true);
        if face_travel {
            let angle = heading(velocity);
            self.world.set_rotation(body, angle);
            self.events.push(StageEvent::FacingChanged { actor: id, angle });
        }

        self.play(sound.as_deref());
        self.events.push(StageEvent::ThrowAnimation { thrower });
        log::trace!("{:?} thrown from {:?} at {:?}", id, start, velocity);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Silence;
    use crate::settings::StageSettings;
    use crate::sim::state::Enemy;

    fn stage_with_pool(config: PoolConfig) -> (Stage, ActorId) {
        let mut stage = Stage::new(StageSettings::default(), Silence);
        let hero = stage.add_hero(&BodyDesc::dynamic(1.0, 1.0), Default::default());
        stage.configure_projectiles(&config);
        (stage, hero)
    }

    #[test]
    fn test_pool_starts_parked() {
        let (stage, _) = stage_with_pool(PoolConfig {
            size: 3,
            ..Default::default()
        });
        assert_eq!(stage.pool().map(ProjectilePool::capacity), Some(3));
        let pool = stage.pool().map(|p| p.slots().to_vec()).unwrap_or_default();
        assert!(pool.iter().all(|&id| !stage.is_enabled(id)));
    }

    #[test]
    fn test_fourth_rapid_throw_is_dropped() {
        let (mut stage, hero) = stage_with_pool(PoolConfig {
            size: 3,
            ..Default::default()
        });
        let v = Vec2::new(5.0, 0.0);
        let thrown: Vec<_> = (0..4)
            .map(|_| stage.throw_fixed(hero, Vec2::new(2.0, 0.0), v))
            .collect();
        assert!(thrown[..3].iter().all(Option::is_some));
        assert_eq!(thrown[3], None);
    }

    #[test]
    fn test_failed_acquire_keeps_cursor() {
        let (mut stage, hero) = stage_with_pool(PoolConfig {
            size: 2,
            ..Default::default()
        });
        let first = stage.throw_fixed(hero, Vec2::X * 2.0, Vec2::X);
        let second = stage.throw_fixed(hero, Vec2::X * 2.0, Vec2::X);
        assert!(stage.throw_fixed(hero, Vec2::X * 2.0, Vec2::X).is_none());

        // Freeing the second slot doesn't help: the cursor waits on the first
        if let Some(id) = second {
            stage.remove_actor(id, true);
        }
        assert!(stage.throw_fixed(hero, Vec2::X * 2.0, Vec2::X).is_none());
        if let Some(id) = first {
            stage.remove_actor(id, true);
        }
        assert_eq!(stage.throw_fixed(hero, Vec2::X * 2.0, Vec2::X), first);
    }

    #[test]
    fn test_shot_budget() {
        let (mut stage, hero) = stage_with_pool(PoolConfig {
            size: 4,
            shot_budget: Some(2),
            ..Default::default()
        });
        assert!(stage.throw_fixed(hero, Vec2::X * 2.0, Vec2::X).is_some());
        assert!(stage.throw_fixed(hero, Vec2::X * 2.0, Vec2::X).is_some());
        assert!(stage.throw_fixed(hero, Vec2::X * 2.0, Vec2::X).is_none());
        assert_eq!(stage.pool().and_then(|p| p.remaining()), Some(0));
    }

    #[test]
    fn test_throw_at_aims() {
        let (mut stage, hero) = stage_with_pool(PoolConfig {
            size: 2,
            face_travel: true,
            ..Default::default()
        });
        let id = stage
            .throw_at(hero, Vec2::new(0.0, 10.0), Vec2::new(0.0, 2.0), Aim::FixedSpeed(4.0))
            .expect("free slot");
        assert!((stage.velocity(id) - Vec2::new(0.0, 4.0)).length() < 1e-5);
        let events = stage.drain_events();
        assert!(events.contains(&StageEvent::ThrowAnimation { thrower: hero }));
        assert!(events.iter().any(|e| matches!(e, StageEvent::FacingChanged { actor, .. } if *actor == id)));

        let damped = stage
            .throw_at(hero, Vec2::new(10.0, 2.0), Vec2::new(0.0, 2.0), Aim::Dampened(0.5))
            .expect("free slot");
        assert!((stage.velocity(damped) - Vec2::new(5.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_fast_projectile_hits_thin_enemy() {
        let settings = StageSettings {
            gravity: Vec2::ZERO,
            ..Default::default()
        };
        let mut stage = Stage::new(settings, Silence);
        let hero = stage.add_hero(&BodyDesc::dynamic(1.0, 1.0), Default::default());
        let enemy = stage.add_enemy(&BodyDesc::fixed(0.2, 1.0).at(5.0, 0.0), Enemy::default().with_damage(1));
        stage.configure_projectiles(&PoolConfig {
            width: 0.25,
            height: 0.25,
            damage: 1,
            ..Default::default()
        });

        let shot = stage.throw_fixed(hero, Vec2::new(2.5, 0.0), Vec2::new(60.0, 0.0));
        assert!(shot.is_some());
        for _ in 0..20 {
            stage.step();
        }
        assert!(!stage.is_enabled(enemy));
        assert_eq!(stage.score().state().enemies_defeated, 1);
    }

    #[test]
    fn test_aim_zero_distance_is_still() {
        assert_eq!(Aim::FixedSpeed(3.0).velocity(Vec2::ONE, Vec2::ONE), Vec2::ZERO);
    }
}
