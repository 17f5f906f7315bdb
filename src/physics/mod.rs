//! Rigid-body world backed by rapier2d
//!
//! The actor layer only needs a narrow slice of a physics engine:
//! - Box-shaped bodies with sensor and enabled flags, addressed by dense handles
//! - Zero-length distance joints and weld joints
//! - Begun / ended contact reports and a pre-solve hook that can switch
//!   solver contacts off
//! - A fixed-size step function
//!
//! Begun and ended contacts are reported in body-handle order, so a level
//! replays identically whatever order rapier found the pairs in.

pub mod contact;
pub mod joint;

pub use contact::{Bodies, Contact, ContactEvent, ContactListener, ContactPoint, Manifold};
pub use joint::{JointDesc, JointHandle, JointKind};

use glam::Vec2;
use rapier2d::prelude::{
    ActiveCollisionTypes, ActiveEvents, ActiveHooks, CCDSolver, ColliderBuilder, ColliderHandle,
    ColliderSet, CollisionEvent, CollisionEventFlags, DefaultBroadPhase, FixedJointBuilder,
    GenericJoint, ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet,
    NarrowPhase, PhysicsPipeline, Point, Real, RigidBody, RigidBodyBuilder, RigidBodyHandle,
    RigidBodySet, RigidBodyType, Rotation, SpringJointBuilder, Vector,
};
use serde::{Deserialize, Serialize};

use contact::{EventCollector, SolverHooks};

/// Spring constants of the zero-length distance joint
const DISTANCE_STIFFNESS: f32 = 200.0;
const DISTANCE_DAMPING: f32 = 20.0;

// glam <-> nalgebra

fn to_na(v: Vec2) -> Vector<Real> {
    Vector::new(v.x, v.y)
}

fn from_na(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

fn to_point(v: Vec2) -> Point<Real> {
    Point::new(v.x, v.y)
}

fn from_point(p: &Point<Real>) -> Vec2 {
    Vec2::new(p.x, p.y)
}

/// Index of a body inside its [`World`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// The kind of rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    /// Never moves, infinite mass
    Static,
    /// Integrated with gravity, pushed out of contacts
    Dynamic,
    /// Moves with its velocity, ignores gravity and contacts
    Kinematic,
}

impl BodyType {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyType::Static => RigidBodyType::Fixed,
            BodyType::Dynamic => RigidBodyType::Dynamic,
            BodyType::Kinematic => RigidBodyType::KinematicVelocityBased,
        }
    }
}

/// Builder for describing a body before creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyDesc {
    pub body_type: BodyType,
    pub position: Vec2,
    pub half_extents: Vec2,
    pub velocity: Vec2,
    pub gravity_scale: f32,
    pub sensor: bool,
    /// Continuous collision detection, for small fast bodies
    pub ccd: bool,
}

impl BodyDesc {
    /// Dynamic box of the given full width and height
    pub fn dynamic(width: f32, height: f32) -> Self {
        Self::new(BodyType::Dynamic, width, height)
    }

    /// Static box of the given full width and height
    pub fn fixed(width: f32, height: f32) -> Self {
        Self::new(BodyType::Static, width, height)
    }

    /// Kinematic box of the given full width and height
    pub fn kinematic(width: f32, height: f32) -> Self {
        Self::new(BodyType::Kinematic, width, height)
    }

    fn new(body_type: BodyType, width: f32, height: f32) -> Self {
        Self {
            body_type,
            position: Vec2::ZERO,
            half_extents: Vec2::new(width / 2.0, height / 2.0),
            velocity: Vec2::ZERO,
            gravity_scale: if body_type == BodyType::Dynamic { 1.0 } else { 0.0 },
            sensor: false,
            ccd: false,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.velocity = vel;
        self
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn with_ccd(mut self, enabled: bool) -> Self {
        self.ccd = enabled;
        self
    }

    /// Sensors report contacts but never push anything
    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }
}

/// Rapier body behind one [`BodyHandle`] and the box it carries
#[derive(Debug, Clone, Copy)]
struct BodyEntry {
    rigid: RigidBodyHandle,
    half_extents: Vec2,
}

/// The rigid-body world
pub struct World {
    gravity: Vec2,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    entries: Vec<BodyEntry>,
}

impl World {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            entries: Vec::new(),
        }
    }

    /// Create a body with one box collider and return its handle.
    ///
    /// Bodies never sleep and never rotate from contacts; rotation only
    /// changes through [`World::set_rotation`] and [`World::set_angular_velocity`].
    pub fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.entries.len() as u32);
        let rb = RigidBodyBuilder::new(desc.body_type.to_rapier())
            .translation(to_na(desc.position))
            .linvel(to_na(desc.velocity))
            .gravity_scale(desc.gravity_scale)
            .ccd_enabled(desc.ccd)
            .can_sleep(false)
            .lock_rotations()
            .user_data(handle.0 as u128)
            .build();
        let rigid = self.rigid_bodies.insert(rb);

        let collider = ColliderBuilder::cuboid(desc.half_extents.x, desc.half_extents.y)
            .sensor(desc.sensor)
            .friction(0.0)
            .restitution(0.0)
            .active_collision_types(
                ActiveCollisionTypes::default()
                    | ActiveCollisionTypes::KINEMATIC_KINEMATIC
                    | ActiveCollisionTypes::KINEMATIC_FIXED,
            )
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS)
            .build();
        self.colliders
            .insert_with_parent(collider, rigid, &mut self.rigid_bodies);

        self.entries.push(BodyEntry {
            rigid,
            half_extents: desc.half_extents,
        });
        handle
    }

    pub fn body_count(&self) -> usize {
        self.entries.len()
    }

    /// Read-only kinematic view of every body
    pub fn bodies(&self) -> Bodies<'_> {
        Bodies::new(&self.rigid_bodies, &self.entries)
    }

    /// Enable or disable a body. Disabled bodies neither move nor touch.
    pub fn set_enabled(&mut self, handle: BodyHandle, enabled: bool) {
        if let Some(rb) = self.rigid_mut(handle) {
            rb.set_enabled(enabled);
        }
    }

    pub fn is_enabled(&self, handle: BodyHandle) -> bool {
        self.rigid(handle).is_some_and(|rb| rb.is_enabled())
    }

    pub fn set_position(&mut self, handle: BodyHandle, pos: Vec2) {
        if let Some(rb) = self.rigid_mut(handle) {
            rb.set_translation(to_na(pos), true);
        }
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, vel: Vec2) {
        if let Some(rb) = self.rigid_mut(handle) {
            rb.set_linvel(to_na(vel), true);
        }
    }

    pub fn position(&self, handle: BodyHandle) -> Vec2 {
        self.rigid(handle)
            .map(|rb| from_na(rb.translation()))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn velocity(&self, handle: BodyHandle) -> Vec2 {
        self.bodies().velocity(handle)
    }

    /// Body rotation in radians
    pub fn rotation(&self, handle: BodyHandle) -> f32 {
        self.rigid(handle).map_or(0.0, |rb| rb.rotation().angle())
    }

    pub fn set_rotation(&mut self, handle: BodyHandle, angle: f32) {
        if let Some(rb) = self.rigid_mut(handle) {
            rb.set_rotation(Rotation::new(angle), true);
        }
    }

    pub fn angular_velocity(&self, handle: BodyHandle) -> f32 {
        self.rigid(handle).map_or(0.0, |rb| rb.angvel())
    }

    pub fn set_angular_velocity(&mut self, handle: BodyHandle, spin: f32) {
        if let Some(rb) = self.rigid_mut(handle) {
            rb.set_angvel(spin, true);
        }
    }

    /// World-space bounding box `(min, max)` of a body's box at its current
    /// position and rotation
    pub fn bounds(&self, handle: BodyHandle) -> Option<(Vec2, Vec2)> {
        let entry = self.entries.get(handle.0 as usize)?;
        let rb = self.rigid_bodies.get(entry.rigid)?;
        let (sin, cos) = rb.rotation().angle().sin_cos();
        let h = entry.half_extents;
        let extent = Vec2::new(
            cos.abs() * h.x + sin.abs() * h.y,
            sin.abs() * h.x + cos.abs() * h.y,
        );
        let center = from_na(rb.translation());
        Some((center - extent, center + extent))
    }

    // -- Joint methods --

    /// Create a joint between two bodies. The anchor is a world point;
    /// it is converted to each body's local frame at creation time.
    /// Welded bodies stop colliding with each other.
    pub fn create_joint(&mut self, desc: &JointDesc) -> Option<JointHandle> {
        let a = self.entries.get(desc.body_a.0 as usize)?.rigid;
        let b = self.entries.get(desc.body_b.0 as usize)?.rigid;
        let anchor = to_point(desc.anchor);
        let local_a = self.rigid_bodies.get(a)?.position().inverse_transform_point(&anchor);
        let local_b = self.rigid_bodies.get(b)?.position().inverse_transform_point(&anchor);

        let joint: GenericJoint = match desc.kind {
            JointKind::Distance => {
                SpringJointBuilder::new(0.0, DISTANCE_STIFFNESS, DISTANCE_DAMPING)
                    .local_anchor1(local_a)
                    .local_anchor2(local_b)
                    .build()
                    .into()
            }
            JointKind::Weld => FixedJointBuilder::new()
                .local_anchor1(local_a)
                .local_anchor2(local_b)
                .contacts_enabled(false)
                .build()
                .into(),
        };
        Some(JointHandle(self.impulse_joints.insert(a, b, joint, true)))
    }

    /// Remove a joint. Returns false if it was already gone.
    pub fn remove_joint(&mut self, handle: JointHandle) -> bool {
        self.impulse_joints.remove(handle.0, true).is_some()
    }

    /// Number of live joints
    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    // -- Stepping --

    /// Advance the world by `dt` seconds.
    ///
    /// `listener.pre_solve` runs inside the step for every touching pair that
    /// reaches the solver. Contacts that began or ended during the step are
    /// returned afterwards, ordered by body handles.
    pub fn step<L: ContactListener>(&mut self, dt: f32, listener: &L) -> Vec<ContactEvent> {
        self.integration_parameters.dt = dt;
        let gravity = to_na(self.gravity);
        let hooks = SolverHooks::new(&self.entries, listener);
        let collector = EventCollector::default();

        self.physics_pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &hooks,
            &collector,
        );

        let mut events: Vec<ContactEvent> = collector
            .take()
            .into_iter()
            .filter_map(|event| self.contact_event(event))
            .collect();
        events.sort_by_key(ContactEvent::order_key);
        events
    }

    // -- private helpers --

    fn rigid(&self, handle: BodyHandle) -> Option<&RigidBody> {
        let entry = self.entries.get(handle.0 as usize)?;
        self.rigid_bodies.get(entry.rigid)
    }

    fn rigid_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let entry = self.entries.get(handle.0 as usize)?;
        self.rigid_bodies.get_mut(entry.rigid)
    }

    fn body_of(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        let parent = self.colliders.get(collider)?.parent()?;
        let rb = self.rigid_bodies.get(parent)?;
        Some(BodyHandle(rb.user_data as u32))
    }

    fn contact_event(&self, event: CollisionEvent) -> Option<ContactEvent> {
        match event {
            CollisionEvent::Started(c1, c2, flags) => {
                let sensor = flags.contains(CollisionEventFlags::SENSOR);
                self.begun_contact(c1, c2, sensor).map(ContactEvent::Began)
            }
            CollisionEvent::Stopped(c1, c2, _) => {
                Some(ContactEvent::Ended(self.body_of(c1)?, self.body_of(c2)?))
            }
        }
    }

    /// Snapshot the manifold of a pair that just started touching. Sensors
    /// and point-less pairs get the dominant axis between the two centers.
    fn begun_contact(&self, c1: ColliderHandle, c2: ColliderHandle, sensor: bool) -> Option<Contact> {
        let (a, b) = (self.body_of(c1)?, self.body_of(c2)?);
        if !sensor {
            if let Some(contact) = self.solid_contact(c1, c2) {
                return Some(contact);
            }
        }
        let normal = dominant_axis(self.position(b) - self.position(a));
        Some(Contact::new(a, b, Manifold::new(normal, Vec::new()), sensor))
    }

    fn solid_contact(&self, c1: ColliderHandle, c2: ColliderHandle) -> Option<Contact> {
        let pair = self.narrow_phase.contact_pair(c1, c2)?;
        let (a, b) = (self.body_of(pair.collider1)?, self.body_of(pair.collider2)?);
        let frame = self.colliders.get(pair.collider1)?.position();
        let manifold = pair.manifolds.iter().find(|m| !m.points.is_empty())?;
        let points = manifold
            .points
            .iter()
            .map(|p| ContactPoint::new(from_point(&frame.transform_point(&p.local_p1))))
            .collect();
        let normal = from_na(&manifold.data.normal);
        Some(Contact::new(a, b, Manifold::new(normal, points), false))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(crate::consts::DEFAULT_GRAVITY)
    }
}

/// The axis-aligned unit vector closest to `delta`
fn dominant_axis(delta: Vec2) -> Vec2 {
    if delta.x.abs() > delta.y.abs() {
        Vec2::new(delta.x.signum(), 0.0)
    } else if delta.y < 0.0 {
        Vec2::NEG_Y
    } else {
        Vec2::Y
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Filter {
        disable_all: bool,
        calls: Mutex<u32>,
    }

    impl ContactListener for Filter {
        fn pre_solve(&self, contact: &mut Contact, _bodies: &Bodies<'_>) {
            if let Ok(mut calls) = self.calls.lock() {
                *calls += 1;
            }
            if self.disable_all {
                contact.disable();
            }
        }
    }

    fn ground_and_box() -> (World, BodyHandle, BodyHandle) {
        let mut world = World::new(Vec2::new(0.0, -10.0));
        let ground = world.create_body(&BodyDesc::fixed(20.0, 1.0).at(0.0, 0.0));
        let crate_box = world.create_body(&BodyDesc::dynamic(1.0, 1.0).at(0.0, 1.2));
        (world, ground, crate_box)
    }

    fn run(world: &mut World, filter: &Filter, steps: u32) -> Vec<ContactEvent> {
        (0..steps)
            .flat_map(|_| world.step(1.0 / 60.0, filter))
            .collect()
    }

    fn began(events: &[ContactEvent]) -> Vec<&Contact> {
        events
            .iter()
            .filter_map(|e| match e {
                ContactEvent::Began(c) => Some(c),
                ContactEvent::Ended(..) => None,
            })
            .collect()
    }

    #[test]
    fn test_falling_box_lands_once() {
        let (mut world, ground, crate_box) = ground_and_box();
        let filter = Filter::default();
        let events = run(&mut world, &filter, 120);

        let began = began(&events);
        assert_eq!(began.len(), 1);
        assert_eq!((began[0].body_a, began[0].body_b), (ground, crate_box));
        assert!(!began[0].manifold.points.is_empty());
        assert!(filter.calls.lock().map_or(0, |c| *c) > 0);
        // Resting on top of the ground (ground top at 0.5, box half height 0.5)
        let y = world.position(crate_box).y;
        assert!((y - 1.0).abs() < 0.05, "box rests at {y}");
    }

    #[test]
    fn test_disabled_contact_lets_body_fall_through() {
        let (mut world, _ground, crate_box) = ground_and_box();
        let filter = Filter {
            disable_all: true,
            ..Default::default()
        };
        let events = run(&mut world, &filter, 120);
        assert!(world.position(crate_box).y < -1.0);
        assert_eq!(began(&events).len(), 1);
        assert!(events.iter().any(|e| matches!(e, ContactEvent::Ended(..))));
    }

    #[test]
    fn test_sensor_reports_but_does_not_push() {
        let mut world = World::new(Vec2::ZERO);
        let sensor = world.create_body(&BodyDesc::fixed(2.0, 2.0).sensor());
        let mover = world.create_body(
            &BodyDesc::dynamic(1.0, 1.0)
                .at(-3.0, 0.0)
                .with_velocity(Vec2::new(6.0, 0.0)),
        );
        let events = run(&mut world, &Filter::default(), 60);
        let began = began(&events);
        assert_eq!(began.len(), 1);
        assert!(began[0].sensor);
        let pair = (began[0].body_a.min(began[0].body_b), began[0].body_a.max(began[0].body_b));
        assert_eq!(pair, (sensor, mover));
        assert!(world.position(mover).x > 2.0);
    }

    #[test]
    fn test_disabled_body_never_touches() {
        let (mut world, _ground, crate_box) = ground_and_box();
        world.set_enabled(crate_box, false);
        assert!(!world.is_enabled(crate_box));
        let events = run(&mut world, &Filter::default(), 60);
        assert!(events.is_empty());
        assert!((world.position(crate_box).y - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_fast_ccd_body_does_not_tunnel() {
        let mut world = World::new(Vec2::ZERO);
        let wall = world.create_body(&BodyDesc::fixed(0.2, 2.0).at(5.0, 0.0));
        let bullet = world.create_body(
            &BodyDesc::dynamic(0.25, 0.25)
                .with_velocity(Vec2::new(90.0, 0.0))
                .with_ccd(true),
        );
        let events = run(&mut world, &Filter::default(), 20);
        let hits: Vec<_> = began(&events)
            .iter()
            .map(|c| (c.body_a.min(c.body_b), c.body_a.max(c.body_b)))
            .collect();
        assert_eq!(hits, vec![(wall, bullet)]);
        assert!(world.position(bullet).x < 5.0);
    }

    #[test]
    fn test_rotation_turns_the_box() {
        let mut world = World::new(Vec2::ZERO);
        let body = world.create_body(&BodyDesc::dynamic(2.0, 1.0));
        let (min, max) = world.bounds(body).unwrap_or_default();
        assert!((max - min - Vec2::new(2.0, 1.0)).length() < 1e-5);

        world.set_rotation(body, std::f32::consts::FRAC_PI_2);
        let (min, max) = world.bounds(body).unwrap_or_default();
        assert!((max - min - Vec2::new(1.0, 2.0)).length() < 1e-4);
        assert!((world.rotation(body) - std::f32::consts::FRAC_PI_2).abs() < 1e-5);

        world.set_angular_velocity(body, 2.0);
        assert_eq!(world.angular_velocity(body), 2.0);
    }

    #[test]
    fn test_weld_carries_dynamic_body() {
        let mut world = World::new(Vec2::new(0.0, -10.0));
        let platform = world.create_body(
            &BodyDesc::kinematic(4.0, 1.0).with_velocity(Vec2::new(1.0, 0.0)),
        );
        let rider = world.create_body(&BodyDesc::dynamic(1.0, 1.0).at(0.0, 1.0));
        let weld = world.create_joint(&JointDesc::weld(platform, rider, Vec2::new(0.0, 0.5)));
        let spring = world.create_joint(&JointDesc::distance(platform, rider, Vec2::new(0.0, 0.5)));
        assert_eq!(world.joint_count(), 2);

        run(&mut world, &Filter::default(), 60);
        let offset = world.position(rider) - world.position(platform);
        assert!((offset - Vec2::new(0.0, 1.0)).length() < 0.02, "offset {offset:?}");

        for joint in [weld, spring].into_iter().flatten() {
            assert!(world.remove_joint(joint));
            assert!(!world.remove_joint(joint));
        }
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn test_joint_needs_known_bodies() {
        let mut world = World::default();
        let only = world.create_body(&BodyDesc::fixed(1.0, 1.0));
        assert!(world
            .create_joint(&JointDesc::weld(only, BodyHandle(9), Vec2::ZERO))
            .is_none());
    }
}
