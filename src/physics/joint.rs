//! Joints between two bodies
//!
//! Both kinds pin a shared anchor point. The distance joint is a zero-length
//! spring that pulls the anchors together; the weld locks relative motion
//! and stops the pair from colliding.

use glam::Vec2;
use rapier2d::prelude::ImpulseJointHandle;
use serde::{Deserialize, Serialize};

use super::BodyHandle;

/// Handle to a joint in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle(pub(crate) ImpulseJointHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointKind {
    /// Distance joint with zero rest length
    Distance,
    /// Rigid weld
    Weld,
}

/// Description of a joint to create.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointDesc {
    pub kind: JointKind,
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// World-space anchor shared by both bodies at creation time
    pub anchor: Vec2,
}

impl JointDesc {
    pub fn distance(body_a: BodyHandle, body_b: BodyHandle, anchor: Vec2) -> Self {
        Self {
            kind: JointKind::Distance,
            body_a,
            body_b,
            anchor,
        }
    }

    pub fn weld(body_a: BodyHandle, body_b: BodyHandle, anchor: Vec2) -> Self {
        Self {
            kind: JointKind::Weld,
            body_a,
            body_b,
            anchor,
        }
    }
}
