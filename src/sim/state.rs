//! Actors and their roles
//!
//! An actor pairs one physics body with a role. Roles form a closed set;
//! collision reactions are dispatched on (dominant role, other role).

use std::fmt;
use std::rc::Rc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::stage::Stage;
use crate::consts::*;
use crate::physics::{BodyHandle, Contact};

/// Index of an actor within its stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

// === Level-authored callbacks ===

/// (stage, obstacle, other actor, contact)
pub type CollideFn = dyn Fn(&mut Stage, ActorId, ActorId, &ContactInfo);
/// (stage, obstacle, projectile, contact) -> true if fully handled
pub type ProjectileFn = dyn Fn(&mut Stage, ActorId, ActorId, &ContactInfo) -> bool;
/// (stage, destination, hero) -> true to let the hero in
pub type ArrivalFn = dyn Fn(&Stage, ActorId, ActorId) -> bool;
/// (stage, enemy, defeating hero if any)
pub type DefeatFn = dyn Fn(&mut Stage, ActorId, Option<ActorId>);
/// (stage, self, the other actor involved)
pub type PairFn = dyn Fn(&mut Stage, ActorId, ActorId);
/// (stage, self)
pub type ActorFn = dyn Fn(&mut Stage, ActorId);

/// A shared callback. Absent callbacks (`None`) simply add no behaviour.
pub struct Hook<F: ?Sized>(pub Rc<F>);

impl<F: ?Sized> Hook<F> {
    /// Clone the callback out so it can be called while the stage is borrowed mutably
    pub fn get(&self) -> Rc<F> {
        Rc::clone(&self.0)
    }
}

impl<F: ?Sized> Clone for Hook<F> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<F: ?Sized> fmt::Debug for Hook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

/// What a reaction handler learns about the contact that triggered it.
/// Captured at contact begin; the engine's contact is gone by the time
/// deferred reactions run.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactInfo {
    /// Either side is a sensor
    pub sensor: bool,
    /// Unit normal pointing from the dominant actor toward the other one
    pub normal: Vec2,
    /// World points of the manifold
    pub points: Vec<Vec2>,
}

impl ContactInfo {
    /// Snapshot a contact, orienting the normal away from `from_body`
    pub fn capture(contact: &Contact, from_body: BodyHandle) -> Self {
        let normal = if from_body == contact.body_a {
            contact.manifold.normal
        } else {
            -contact.manifold.normal
        };
        Self {
            sensor: contact.sensor,
            normal,
            points: contact.manifold.points.iter().map(|p| p.position).collect(),
        }
    }

    /// Contact info for reactions triggered without a physical contact
    pub fn none() -> Self {
        Self {
            sensor: false,
            normal: Vec2::ZERO,
            points: Vec::new(),
        }
    }
}

// === Contact policy traits shared by every role ===

/// A side of an actor's box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::Top => 0,
            Side::Right => 1,
            Side::Bottom => 2,
            Side::Left => 3,
        }
    }

    /// Outward unit normal of this side
    pub fn outward(self) -> Vec2 {
        match self {
            Side::Top => Vec2::Y,
            Side::Right => Vec2::X,
            Side::Bottom => Vec2::NEG_Y,
            Side::Left => Vec2::NEG_X,
        }
    }

    /// The side whose outward normal is closest to `dir`
    pub fn facing(dir: Vec2) -> Side {
        if dir.y.abs() >= dir.x.abs() {
            if dir.y >= 0.0 { Side::Top } else { Side::Bottom }
        } else if dir.x >= 0.0 {
            Side::Right
        } else {
            Side::Left
        }
    }
}

/// How an actor's contacts are filtered before the solver runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactTraits {
    /// Sides that glue touching actors in place, indexed by [`Side::index`]
    pub sticky_sides: [bool; 4],
    /// The only side this actor is solid from
    pub one_sided: Option<Side>,
    /// Actors sharing the same nonzero id never collide physically
    pub pass_through: u32,
    /// Seconds after being released from a sticky actor before sticking again
    pub stick_delay: f32,
    /// Stage time before which this actor cannot be stuck
    pub stick_cooldown_until: f32,
}

impl Default for ContactTraits {
    fn default() -> Self {
        Self {
            sticky_sides: [false; 4],
            one_sided: None,
            pass_through: 0,
            stick_delay: DEFAULT_STICK_DELAY,
            stick_cooldown_until: 0.0,
        }
    }
}

impl ContactTraits {
    pub fn is_sticky(&self) -> bool {
        self.sticky_sides.iter().any(|&s| s)
    }

    pub fn is_sticky_on(&self, side: Side) -> bool {
        self.sticky_sides[side.index()]
    }
}

// === Roles ===

/// The player-controlled actor
#[derive(Debug, Clone)]
pub struct Hero {
    pub strength: i32,
    /// Seconds of invincibility left
    pub invincible_remaining: f32,
    /// Velocity added by a jump
    pub jump_impulse: Vec2,
    pub in_air: bool,
    /// Allow jumping again while airborne
    pub multi_jump: bool,
    pub crawling: bool,
    /// Losing this hero loses the level
    pub must_survive: bool,
    /// Angular velocity applied while a jump is in progress
    pub jump_rotation: Option<f32>,
    pub jump_sound: Option<String>,
    pub strength_change_callback: Option<Hook<ActorFn>>,
}

impl Default for Hero {
    fn default() -> Self {
        Self {
            strength: 1,
            invincible_remaining: 0.0,
            jump_impulse: Vec2::new(0.0, 10.0),
            in_air: false,
            multi_jump: false,
            crawling: false,
            must_survive: false,
            jump_rotation: None,
            jump_sound: None,
            strength_change_callback: None,
        }
    }
}

impl Hero {
    pub fn with_strength(mut self, strength: i32) -> Self {
        self.strength = strength;
        self
    }

    pub fn must_survive(mut self) -> Self {
        self.must_survive = true;
        self
    }

    pub fn on_strength_change(mut self, f: impl Fn(&mut Stage, ActorId) + 'static) -> Self {
        let f: Rc<ActorFn> = Rc::new(f);
        self.strength_change_callback = Some(Hook(f));
        self
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_remaining > 0.0
    }
}

/// Something that hurts heroes
#[derive(Debug, Clone)]
pub struct Enemy {
    pub damage: i32,
    pub defeat_by_crawl: bool,
    pub defeat_by_jump: bool,
    pub immune_to_invincibility: bool,
    /// Defeats the hero even through invincibility
    pub always_does_damage: bool,
    pub on_defeated: Option<Hook<DefeatFn>>,
    /// (stage, enemy, hero)
    pub on_defeat_hero: Option<Hook<PairFn>>,
}

impl Default for Enemy {
    fn default() -> Self {
        Self {
            damage: 2,
            defeat_by_crawl: false,
            defeat_by_jump: false,
            immune_to_invincibility: false,
            always_does_damage: false,
            on_defeated: None,
            on_defeat_hero: None,
        }
    }
}

impl Enemy {
    pub fn with_damage(mut self, damage: i32) -> Self {
        self.damage = damage;
        self
    }

    pub fn on_defeated(mut self, f: impl Fn(&mut Stage, ActorId, Option<ActorId>) + 'static) -> Self {
        let f: Rc<DefeatFn> = Rc::new(f);
        self.on_defeated = Some(Hook(f));
        self
    }

    pub fn on_defeat_hero(mut self, f: impl Fn(&mut Stage, ActorId, ActorId) + 'static) -> Self {
        let f: Rc<PairFn> = Rc::new(f);
        self.on_defeat_hero = Some(Hook(f));
        self
    }
}

/// Something heroes collect
#[derive(Debug, Clone)]
pub struct Goodie {
    /// Added to the four running goodie counters
    pub score: [i32; 4],
    /// Added to the collecting hero's strength
    pub strength_boost: i32,
    /// Seconds of invincibility granted to the collecting hero
    pub invincibility: f32,
    /// (stage, goodie, hero)
    pub on_hero_collect: Option<Hook<PairFn>>,
}

impl Default for Goodie {
    fn default() -> Self {
        Self {
            score: [1, 0, 0, 0],
            strength_boost: 0,
            invincibility: 0.0,
            on_hero_collect: None,
        }
    }
}

impl Goodie {
    pub fn with_score(mut self, score: [i32; 4]) -> Self {
        self.score = score;
        self
    }

    pub fn on_hero_collect(mut self, f: impl Fn(&mut Stage, ActorId, ActorId) + 'static) -> Self {
        let f: Rc<PairFn> = Rc::new(f);
        self.on_hero_collect = Some(Hook(f));
        self
    }
}

/// Where heroes go to finish the level
#[derive(Debug, Clone)]
pub struct Destination {
    pub capacity: u32,
    pub holding: u32,
    pub arrival_sound: Option<String>,
    pub on_attempt_arrival: Option<Hook<ArrivalFn>>,
}

impl Default for Destination {
    fn default() -> Self {
        Self {
            capacity: 1,
            holding: 0,
            arrival_sound: None,
            on_attempt_arrival: None,
        }
    }
}

impl Destination {
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn on_attempt_arrival(mut self, f: impl Fn(&Stage, ActorId, ActorId) -> bool + 'static) -> Self {
        let f: Rc<ArrivalFn> = Rc::new(f);
        self.on_attempt_arrival = Some(Hook(f));
        self
    }

    pub fn has_room(&self) -> bool {
        self.holding < self.capacity
    }
}

/// Walls, floors, platforms and other scenery with behaviour
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub hero_collision: Option<Hook<CollideFn>>,
    pub enemy_collision: Option<Hook<CollideFn>>,
    pub projectile_collision: Option<Hook<ProjectileFn>>,
    pub collide_sound: Option<String>,
    /// Minimum seconds between two collide sounds (stage default when `None`)
    pub collide_sound_delay: Option<f32>,
    /// Stage time the collide sound last played
    pub last_collide_sound: Option<f32>,
    /// Landing on this obstacle does not re-enable jumping
    pub no_jump_reenable: bool,
}

impl Default for Obstacle {
    fn default() -> Self {
        Self {
            hero_collision: None,
            enemy_collision: None,
            projectile_collision: None,
            collide_sound: None,
            collide_sound_delay: None,
            last_collide_sound: None,
            no_jump_reenable: false,
        }
    }
}

impl Obstacle {
    pub fn on_hero_collision(
        mut self,
        f: impl Fn(&mut Stage, ActorId, ActorId, &ContactInfo) + 'static,
    ) -> Self {
        let f: Rc<CollideFn> = Rc::new(f);
        self.hero_collision = Some(Hook(f));
        self
    }

    pub fn on_enemy_collision(
        mut self,
        f: impl Fn(&mut Stage, ActorId, ActorId, &ContactInfo) + 'static,
    ) -> Self {
        let f: Rc<CollideFn> = Rc::new(f);
        self.enemy_collision = Some(Hook(f));
        self
    }

    pub fn on_projectile_collision(
        mut self,
        f: impl Fn(&mut Stage, ActorId, ActorId, &ContactInfo) -> bool + 'static,
    ) -> Self {
        let f: Rc<ProjectileFn> = Rc::new(f);
        self.projectile_collision = Some(Hook(f));
        self
    }

    pub fn with_collide_sound(mut self, name: &str, delay: f32) -> Self {
        self.collide_sound = Some(name.to_string());
        self.collide_sound_delay = Some(delay);
        self
    }

    /// Whether the collide sound may play at stage time `now`
    pub fn collide_sound_ready(&self, now: f32, default_delay: f32) -> bool {
        let delay = self.collide_sound_delay.unwrap_or(default_delay);
        match self.last_collide_sound {
            None => true,
            Some(last) => now - last >= delay,
        }
    }

    pub fn no_jump_reenable(mut self) -> Self {
        self.no_jump_reenable = true;
        self
    }
}

/// A pooled, thrown actor
#[derive(Debug, Clone)]
pub struct Projectile {
    pub damage: i32,
    /// Maximum travel distance from `range_origin`
    pub range: f32,
    /// Launch position of the current flight
    pub range_origin: Vec2,
    pub disappear_on_collide: bool,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            damage: 1,
            range: DEFAULT_PROJECTILE_RANGE,
            range_origin: Vec2::ZERO,
            disappear_on_collide: true,
        }
    }
}

impl Projectile {
    /// Squared distance from the launch point beyond which the flight ends
    pub fn range_squared(&self) -> f32 {
        self.range * self.range
    }
}

/// Role tag without the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Hero,
    Enemy,
    Projectile,
    Obstacle,
    Goodie,
    Destination,
}

impl RoleKind {
    /// Dominance rank for contact dispatch, lower wins
    pub fn rank(self) -> u8 {
        match self {
            RoleKind::Hero => 0,
            RoleKind::Enemy => 1,
            RoleKind::Projectile => 2,
            RoleKind::Obstacle => 3,
            RoleKind::Goodie => 4,
            RoleKind::Destination => 5,
        }
    }
}

/// An actor's role and its role-specific state
#[derive(Debug, Clone)]
pub enum Role {
    Hero(Hero),
    Enemy(Enemy),
    Goodie(Goodie),
    Destination(Destination),
    Obstacle(Obstacle),
    Projectile(Projectile),
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Hero(_) => RoleKind::Hero,
            Role::Enemy(_) => RoleKind::Enemy,
            Role::Goodie(_) => RoleKind::Goodie,
            Role::Destination(_) => RoleKind::Destination,
            Role::Obstacle(_) => RoleKind::Obstacle,
            Role::Projectile(_) => RoleKind::Projectile,
        }
    }
}

/// An entity pairing a physics body with a role
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub body: BodyHandle,
    pub role: Role,
    /// False once removed, or while a pooled projectile is not in flight
    pub enabled: bool,
    pub traits: ContactTraits,
    /// Played when removed non-quietly
    pub disappear_sound: Option<String>,
}

macro_rules! role_accessors {
    ($($variant:ident => $get:ident, $get_mut:ident;)*) => {
        impl Actor {
            $(
                pub fn $get(&self) -> Option<&$variant> {
                    match &self.role {
                        Role::$variant(r) => Some(r),
                        _ => None,
                    }
                }

                pub fn $get_mut(&mut self) -> Option<&mut $variant> {
                    match &mut self.role {
                        Role::$variant(r) => Some(r),
                        _ => None,
                    }
                }
            )*
        }
    };
}

role_accessors! {
    Hero => hero, hero_mut;
    Enemy => enemy, enemy_mut;
    Goodie => goodie, goodie_mut;
    Destination => destination, destination_mut;
    Obstacle => obstacle, obstacle_mut;
    Projectile => projectile, projectile_mut;
}

impl Actor {
    pub fn kind(&self) -> RoleKind {
        self.role.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order() {
        let mut kinds = [
            RoleKind::Destination,
            RoleKind::Goodie,
            RoleKind::Obstacle,
            RoleKind::Projectile,
            RoleKind::Enemy,
            RoleKind::Hero,
        ];
        kinds.sort_by_key(|k| k.rank());
        assert_eq!(
            kinds,
            [
                RoleKind::Hero,
                RoleKind::Enemy,
                RoleKind::Projectile,
                RoleKind::Obstacle,
                RoleKind::Goodie,
                RoleKind::Destination,
            ]
        );
    }

    #[test]
    fn test_side_facing() {
        assert_eq!(Side::facing(Vec2::new(0.1, 1.0)), Side::Top);
        assert_eq!(Side::facing(Vec2::new(0.0, -1.0)), Side::Bottom);
        assert_eq!(Side::facing(Vec2::new(2.0, 1.0)), Side::Right);
        assert_eq!(Side::facing(Vec2::new(-2.0, 1.0)), Side::Left);
        for side in Side::ALL {
            assert_eq!(Side::facing(side.outward()), side);
        }
    }

    #[test]
    fn test_obstacle_sound_cooldown() {
        let mut obstacle = Obstacle::default().with_collide_sound("thud", 1.0);
        assert!(obstacle.collide_sound_ready(0.0, 0.5));
        obstacle.last_collide_sound = Some(2.0);
        assert!(!obstacle.collide_sound_ready(2.5, 0.5));
        assert!(obstacle.collide_sound_ready(3.0, 0.5));

        let plain = Obstacle {
            last_collide_sound: Some(2.0),
            ..Default::default()
        };
        assert!(plain.collide_sound_ready(2.5, 0.5));
    }

    #[test]
    fn test_role_accessors() {
        let actor = Actor {
            id: ActorId(0),
            body: BodyHandle(0),
            role: Role::Enemy(Enemy::default()),
            enabled: true,
            traits: ContactTraits::default(),
            disappear_sound: None,
        };
        assert_eq!(actor.kind(), RoleKind::Enemy);
        assert_eq!(actor.enemy().map(|e| e.damage), Some(2));
        assert!(actor.hero().is_none());
    }
}
