//! Contacts and the listener interface
//!
//! A touching pair is reported twice at most per step: through
//! `ContactListener::pre_solve` while the solver runs (every step the pair
//! reaches the solver), and as a [`ContactEvent`] returned from the step
//! when it began or ended.

use std::sync::{Mutex, PoisonError};

use glam::Vec2;
use rapier2d::prelude::{
    ColliderSet, CollisionEvent, ContactModificationContext, ContactPair, EventHandler,
    PhysicsHooks, Real, RigidBody, RigidBodyHandle, RigidBodySet,
};

use super::{from_na, to_point, BodyEntry, BodyHandle};

/// One point of a contact manifold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// World position
    pub position: Vec2,
    /// Cleared by `pre_solve` to exclude this point from the solver
    pub enabled: bool,
}

impl ContactPoint {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            enabled: true,
        }
    }
}

/// Geometric description of a touching pair
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    /// Unit normal pointing from body A toward body B
    pub normal: Vec2,
    /// Points on the contact face. Empty for sensors.
    pub points: Vec<ContactPoint>,
}

impl Manifold {
    pub fn new(normal: Vec2, points: Vec<ContactPoint>) -> Self {
        Self { normal, points }
    }
}

/// A touching pair, valid for the duration of one listener call
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub manifold: Manifold,
    /// Either body is a sensor
    pub sensor: bool,
    enabled: bool,
}

impl Contact {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, manifold: Manifold, sensor: bool) -> Self {
        Self {
            body_a,
            body_b,
            manifold,
            sensor,
            enabled: true,
        }
    }

    /// Switch the whole contact off for this step
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Switch a single manifold point off for this step
    pub fn disable_point(&mut self, index: usize) {
        if let Some(point) = self.manifold.points.get_mut(index) {
            point.enabled = false;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enabled and at least one point left for the solver
    pub fn is_active(&self) -> bool {
        self.enabled && self.manifold.points.iter().any(|p| p.enabled)
    }

    /// First manifold point
    pub fn first_point(&self) -> Option<Vec2> {
        self.manifold.points.first().map(|p| p.position)
    }
}

/// A contact that began or ended during a step
#[derive(Debug, Clone, PartialEq)]
pub enum ContactEvent {
    Began(Contact),
    Ended(BodyHandle, BodyHandle),
}

impl ContactEvent {
    /// The pair's handles, lowest first
    pub(super) fn order_key(&self) -> (BodyHandle, BodyHandle) {
        let (a, b) = match self {
            ContactEvent::Began(c) => (c.body_a, c.body_b),
            ContactEvent::Ended(a, b) => (*a, *b),
        };
        (a.min(b), a.max(b))
    }
}

/// Read-only kinematic view of the world's bodies
#[derive(Clone, Copy)]
pub struct Bodies<'a> {
    set: &'a RigidBodySet,
    entries: &'a [BodyEntry],
}

impl<'a> Bodies<'a> {
    pub(super) fn new(set: &'a RigidBodySet, entries: &'a [BodyEntry]) -> Self {
        Self { set, entries }
    }

    fn rigid(&self, body: BodyHandle) -> Option<&'a RigidBody> {
        let entry = self.entries.get(body.0 as usize)?;
        self.set.get(entry.rigid)
    }

    pub fn velocity(&self, body: BodyHandle) -> Vec2 {
        self.rigid(body).map_or(Vec2::ZERO, |rb| from_na(rb.linvel()))
    }

    /// Velocity of the material point of `body` at world position `point`
    pub fn velocity_at(&self, body: BodyHandle, point: Vec2) -> Vec2 {
        self.rigid(body).map_or(Vec2::ZERO, |rb| {
            from_na(&rb.velocity_at_point(&to_point(point)))
        })
    }
}

/// Receives every solver-bound contact while the world steps.
///
/// Runs inside the physics pipeline: listeners may inspect bodies and switch
/// points off, but must queue any structural change for after the step.
pub trait ContactListener: Sync {
    fn pre_solve(&self, _contact: &mut Contact, _bodies: &Bodies<'_>) {}
}

/// No-op listener for plain stepping
impl ContactListener for () {}

/// Bridges rapier's solver-contact hook to a [`ContactListener`]
pub(super) struct SolverHooks<'a, L> {
    entries: &'a [BodyEntry],
    listener: &'a L,
}

impl<'a, L: ContactListener> SolverHooks<'a, L> {
    pub(super) fn new(entries: &'a [BodyEntry], listener: &'a L) -> Self {
        Self { entries, listener }
    }
}

fn user_handle(set: &RigidBodySet, rigid: Option<RigidBodyHandle>) -> Option<BodyHandle> {
    set.get(rigid?).map(|rb| BodyHandle(rb.user_data as u32))
}

impl<L: ContactListener> PhysicsHooks for SolverHooks<'_, L> {
    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        let (Some(a), Some(b)) = (
            user_handle(context.bodies, context.rigid_body1),
            user_handle(context.bodies, context.rigid_body2),
        ) else {
            return;
        };
        let points = context
            .solver_contacts
            .iter()
            .map(|c| ContactPoint::new(Vec2::new(c.point.x, c.point.y)))
            .collect();
        let mut contact = Contact::new(a, b, Manifold::new(from_na(&*context.normal), points), false);

        self.listener
            .pre_solve(&mut contact, &Bodies::new(context.bodies, self.entries));

        if !contact.is_enabled() {
            context.solver_contacts.clear();
            return;
        }
        let mut index = 0;
        context.solver_contacts.retain(|_| {
            let keep = contact.manifold.points.get(index).is_none_or(|p| p.enabled);
            index += 1;
            keep
        });
    }
}

/// Collects collision events raised during a step
#[derive(Default)]
pub(super) struct EventCollector {
    events: Mutex<Vec<CollisionEvent>>,
}

impl EventCollector {
    pub(super) fn take(self) -> Vec<CollisionEvent> {
        self.events.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventHandler for EventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}
