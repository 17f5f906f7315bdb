//! Sticky attachment joints
//!
//! A link is a zero-length distance joint plus a weld joint sharing one
//! anchor. Links are only created and destroyed between physics steps.

use glam::Vec2;

use super::state::ActorId;
use crate::physics::{BodyHandle, JointDesc, JointHandle, World};

/// Two joints binding an actor to a sticky actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickyLink {
    /// The actor that declared the sticky side
    pub sticky: ActorId,
    pub other: ActorId,
    pub distance: JointHandle,
    pub weld: JointHandle,
}

impl StickyLink {
    pub fn involves(&self, actor: ActorId) -> bool {
        self.sticky == actor || self.other == actor
    }

    pub fn joins(&self, a: ActorId, b: ActorId) -> bool {
        (self.sticky == a && self.other == b) || (self.sticky == b && self.other == a)
    }
}

/// Owns every live sticky link of a stage
#[derive(Debug, Clone, Default)]
pub struct StickyJointManager {
    links: Vec<StickyLink>,
}

impl StickyJointManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a link between these two actors exists, in either role
    pub fn is_linked(&self, a: ActorId, b: ActorId) -> bool {
        self.links.iter().any(|l| l.joins(a, b))
    }

    /// Whether this actor is part of any link
    pub fn is_attached(&self, actor: ActorId) -> bool {
        self.links.iter().any(|l| l.involves(actor))
    }

    /// Create both joints at `anchor`. Returns false if the pair is already
    /// linked or either body is unknown to the world.
    pub fn attach(
        &mut self,
        world: &mut World,
        sticky: (ActorId, BodyHandle),
        other: (ActorId, BodyHandle),
        anchor: Vec2,
    ) -> bool {
        if self.is_linked(sticky.0, other.0) {
            return false;
        }
        let Some(distance) = world.create_joint(&JointDesc::distance(sticky.1, other.1, anchor))
        else {
            return false;
        };
        let Some(weld) = world.create_joint(&JointDesc::weld(sticky.1, other.1, anchor)) else {
            world.remove_joint(distance);
            return false;
        };
        self.links.push(StickyLink {
            sticky: sticky.0,
            other: other.0,
            distance,
            weld,
        });
        log::debug!("{:?} stuck to {:?} at {:?}", other.0, sticky.0, anchor);
        true
    }

    /// Break every link involving `actor` and return them
    pub fn detach_all(&mut self, world: &mut World, actor: ActorId) -> Vec<StickyLink> {
        let (gone, kept): (Vec<_>, Vec<_>) = self.links.iter().partition(|l| l.involves(actor));
        self.links = kept;
        for link in &gone {
            world.remove_joint(link.distance);
            world.remove_joint(link.weld);
            log::debug!("{:?} released from {:?}", link.other, link.sticky);
        }
        gone
    }

    pub fn links(&self) -> &[StickyLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
