//! Arcade Stage - collision-driven actor interactions for 2D levels
//!
//! Core modules:
//! - `physics`: Rigid-body world on rapier2d (box bodies, joints, contact filtering)
//! - `sim`: Actors, role reactions, contact filtering, projectile pool, scoring
//! - `audio`: Fire-and-forget sound collaborator
//! - `settings`: Data-driven stage configuration
//! - `facts`: Scalar facts a game opts into keeping across levels

pub mod audio;
pub mod error;
pub mod facts;
pub mod physics;
pub mod settings;
pub mod sim;

pub use error::StoreError;
pub use facts::Facts;
pub use settings::{StageSettings, StepPolicy};

use glam::Vec2;

/// Stage configuration constants
pub mod consts {
    use glam::Vec2;

    /// Fixed simulation timestep (60 Hz, one step per rendered frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame when catching up on slow frames
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Shortest physics step a stage accepts
    pub const MIN_SUBSTEP: f32 = 1.0 / 1000.0;

    /// Default world gravity (y is up)
    pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, -10.0);

    /// Seconds before a released actor may stick again
    pub const DEFAULT_STICK_DELAY: f32 = 0.5;
    /// Seconds between two collide sounds of the same obstacle
    pub const DEFAULT_COLLIDE_SOUND_DELAY: f32 = 0.5;

    /// Default projectile travel distance before it is reclaimed
    pub const DEFAULT_PROJECTILE_RANGE: f32 = 1000.0;
}

/// Angle (radians) of a direction vector, 0 when the vector is zero
#[inline]
pub fn heading(dir: Vec2) -> f32 {
    if dir.length_squared() == 0.0 {
        0.0
    } else {
        dir.y.atan2(dir.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading() {
        assert_eq!(heading(Vec2::ZERO), 0.0);
        assert!((heading(Vec2::new(0.0, 2.0)) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((heading(Vec2::new(-1.0, 0.0)).abs() - std::f32::consts::PI).abs() < 1e-6);
    }
}
