//! Actor interaction simulation
//!
//! Everything that happens in a level lives here. This module is single
//! threaded and deterministic:
//! - Fixed timestep only
//! - Contact reactions deferred until the physics step returns
//! - Stable iteration order (by body and actor id)
//! - No rendering or platform dependencies

pub mod collision;
pub mod deferred;
pub mod enemy;
pub mod filter;
pub mod hero;
pub mod pool;
pub mod projectile;
pub mod score;
pub mod stage;
pub mod state;
pub mod sticky;
pub mod tick;

pub use collision::dispatch_begin;
pub use deferred::{Deferred, DeferredQueue};
pub use filter::{filter_contact, shares_pass_through, ContactView, StickRequest, StickRequests};
pub use pool::{Aim, PoolConfig, ProjectilePool};
pub use score::{EnemyGoal, Outcome, ScoreState, ScoreTracker, VictoryMode};
pub use stage::{Stage, StageEvent};
pub use state::{
    Actor, ActorId, ContactInfo, ContactTraits, Destination, Enemy, Goodie, Hero, Hook, Obstacle,
    Projectile, Role, RoleKind, Side,
};
pub use sticky::{StickyJointManager, StickyLink};
pub use tick::tick;
