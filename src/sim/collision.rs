//! Contact dispatch
//!
//! At contact begin the higher-ranked actor of the pair becomes dominant and
//! its reaction is queued. Reactions run after the step, one per begin event,
//! in the order the contacts began.

use super::deferred::Deferred;
use super::stage::Stage;
use super::state::{Actor, ActorId, ContactInfo, RoleKind};
use crate::physics::Contact;

/// Classify a newly begun contact. Returns the reaction to queue, or `None`
/// when the dominant role has no reactions of its own.
pub fn dispatch_begin(a: &Actor, b: &Actor, contact: &Contact) -> Option<Deferred> {
    let (dominant, other) = if a.kind().rank() <= b.kind().rank() {
        (a, b)
    } else {
        (b, a)
    };

    match dominant.kind() {
        RoleKind::Hero | RoleKind::Enemy | RoleKind::Projectile => {}
        RoleKind::Obstacle | RoleKind::Goodie | RoleKind::Destination => return None,
    }

    log::trace!(
        "{:?} {:?} meets {:?} {:?}",
        dominant.kind(),
        dominant.id,
        other.kind(),
        other.id
    );
    Some(Deferred::Collide {
        dominant: dominant.id,
        other: other.id,
        info: ContactInfo::capture(contact, dominant.body),
    })
}

impl Stage {
    /// Run the dominant actor's reaction to `other`.
    /// Nothing happens if either actor was removed since the contact began.
    pub fn on_collide(&mut self, dominant: ActorId, other: ActorId, info: &ContactInfo) {
        let (Some(d), Some(o)) = (self.actor(dominant), self.actor(other)) else {
            return;
        };
        if !d.enabled || !o.enabled {
            log::trace!("Skipping reaction of {:?} to removed {:?}", dominant, other);
            return;
        }

        use RoleKind::*;
        match (d.kind(), o.kind()) {
            (Hero, Enemy) => self.hero_meets_enemy(dominant, other),
            (Hero, Destination) => {
                self.receive(other, dominant);
            }
            (Hero, Obstacle) => self.hero_meets_obstacle(dominant, other, info),
            (Hero, Goodie) => self.hero_meets_goodie(dominant, other),
            (Enemy, Obstacle) => self.enemy_meets_obstacle(dominant, other, info),
            (Enemy, Projectile) => self.enemy_meets_projectile(dominant, other),
            (Projectile, _) => self.projectile_meets(dominant, other, info),
            _ => {}
        }
    }
}
