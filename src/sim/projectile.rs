//! Projectile reactions, reclaiming and the range check

use super::stage::Stage;
use super::state::{ActorId, ContactInfo, Projectile};

impl Stage {
    pub fn projectile(&self, id: ActorId) -> Option<&Projectile> {
        self.actor(id).and_then(|a| a.projectile())
    }

    /// Take a projectile out of flight, freeing its pool slot
    pub fn reclaim_projectile(&mut self, id: ActorId, quiet: bool) {
        if self.projectile(id).is_some() {
            self.remove_actor(id, quiet);
        }
    }

    /// Reclaim, silently, every projectile that flew past its range
    pub fn check_projectile_ranges(&mut self) {
        let Some(pool) = self.pool.as_ref() else {
            return;
        };
        let expired: Vec<ActorId> = pool
            .slots()
            .iter()
            .copied()
            .filter(|&id| {
                let Some(actor) = self.actor(id).filter(|a| a.enabled) else {
                    return false;
                };
                let Some(p) = actor.projectile() else {
                    return false;
                };
                let travelled = self.world.position(actor.body) - p.range_origin;
                travelled.length_squared() > p.range_squared()
            })
            .collect();
        for id in expired {
            log::trace!("{:?} out of range", id);
            self.reclaim_projectile(id, true);
        }
    }

    /// A projectile hit something other than an enemy
    pub(super) fn projectile_meets(&mut self, projectile_id: ActorId, other: ActorId, info: &ContactInfo) {
        let callback = self
            .actor(other)
            .and_then(|a| a.obstacle())
            .and_then(|o| o.projectile_collision.as_ref())
            .map(|h| h.get());
        if let Some(callback) = callback {
            if callback(self, other, projectile_id, info) {
                return;
            }
        }

        if info.sensor {
            return;
        }
        let disappear = self
            .projectile(projectile_id)
            .is_some_and(|p| p.disappear_on_collide);
        if disappear {
            self.reclaim_projectile(projectile_id, false);
        }
    }
}
