//! Pre-solve contact filtering
//!
//! Runs inside the physics step for every touching actor pair, before the
//! solver. Three independent policies:
//! - pass-through groups switch the whole contact off
//! - one-sided actors switch off manifold points approached from the open side
//! - sticky sides request a link, created once the step has returned

use glam::Vec2;

use super::state::{Actor, ActorId, ContactTraits, Side};
use super::sticky::StickyJointManager;
use crate::physics::{Bodies, BodyHandle, Contact};

/// What the filter needs to know about one actor, copied out before the step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactView {
    pub id: ActorId,
    pub body: BodyHandle,
    pub traits: ContactTraits,
}

impl From<&Actor> for ContactView {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id,
            body: actor.body,
            traits: actor.traits,
        }
    }
}

/// Glue `other` to `sticky` at a world anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickRequest {
    pub sticky: ActorId,
    pub other: ActorId,
    pub anchor: Vec2,
}

impl StickRequest {
    pub fn joins(&self, a: ActorId, b: ActorId) -> bool {
        (self.sticky == a && self.other == b) || (self.sticky == b && self.other == a)
    }
}

/// Stick requests gathered during one step, at most one per pair
#[derive(Debug, Clone, Default)]
pub struct StickRequests {
    requests: Vec<StickRequest>,
}

impl StickRequests {
    /// Keep `request` unless its pair already has one. Returns whether it was kept.
    pub fn offer(&mut self, request: StickRequest) -> bool {
        if self
            .requests
            .iter()
            .any(|r| r.joins(request.sticky, request.other))
        {
            return false;
        }
        self.requests.push(request);
        true
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn into_vec(self) -> Vec<StickRequest> {
        self.requests
    }
}

/// Apply every contact policy of the pair `a`/`b` (bodies A and B of
/// `contact`) and return a stick request if one of them wants to glue the
/// other.
pub fn filter_contact(
    a: &ContactView,
    b: &ContactView,
    contact: &mut Contact,
    bodies: &Bodies<'_>,
    sticky: &StickyJointManager,
    now: f32,
) -> Option<StickRequest> {
    if shares_pass_through(&a.traits, &b.traits) {
        log::trace!("{:?} and {:?} pass through each other", a.id, b.id);
        contact.disable();
    }

    if sticky.is_linked(a.id, b.id) {
        return None;
    }
    filter_one_sided(a, b, contact, bodies);
    stick_request(a, b, contact, now)
}

/// Equal nonzero group ids never collide
pub fn shares_pass_through(a: &ContactTraits, b: &ContactTraits) -> bool {
    a.pass_through != 0 && a.pass_through == b.pass_through
}

fn filter_one_sided(a: &ContactView, b: &ContactView, contact: &mut Contact, bodies: &Bodies<'_>) {
    let ((platform, side), other) = match (a.traits.one_sided, b.traits.one_sided) {
        (Some(side), None) => ((a, side), b),
        (None, Some(side)) => ((b, side), a),
        _ => return,
    };

    for index in 0..contact.manifold.points.len() {
        let point = contact.manifold.points[index].position;
        let relative = bodies.velocity_at(other.body, point) - bodies.velocity_at(platform.body, point);
        if approaches_open_side(side, relative) {
            contact.disable_point(index);
        }
    }
    if !contact.is_active() {
        log::trace!("{:?} passes {:?} side of {:?}", other.id, side, platform.id);
    }
}

/// Whether a body moving at `relative` (relative to the platform) is coming
/// from anywhere but the platform's solid side
fn approaches_open_side(solid: Side, relative: Vec2) -> bool {
    match solid {
        Side::Top => relative.y > 0.0,
        Side::Bottom => relative.y < 0.0,
        Side::Right => relative.x > 0.0,
        Side::Left => relative.x < 0.0,
    }
}

fn stick_request(a: &ContactView, b: &ContactView, contact: &Contact, now: f32) -> Option<StickRequest> {
    if !a.traits.is_sticky() && !b.traits.is_sticky() {
        return None;
    }
    let anchor = contact.first_point()?;

    [(a, b), (b, a)].into_iter().find_map(|(s, o)| {
        if !s.traits.is_sticky() || now < o.traits.stick_cooldown_until {
            return None;
        }
        // Normal from the sticky actor toward the other one
        let normal = if s.body == contact.body_a {
            contact.manifold.normal
        } else {
            -contact.manifold.normal
        };
        s.traits.is_sticky_on(Side::facing(normal)).then_some(StickRequest {
            sticky: s.id,
            other: o.id,
            anchor,
        })
    })
}
