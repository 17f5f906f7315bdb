//! Post-step work queue
//!
//! Contact callbacks run while the world is mid-step and may not touch
//! bodies or joints. Everything they decide is queued here and drained,
//! in scheduling order, once the step has returned.

use std::collections::VecDeque;
use std::fmt;

use glam::Vec2;

use super::stage::Stage;
use super::state::{ActorId, ContactInfo};

/// A unit of deferred work
pub enum Deferred {
    /// Run the dominant actor's collision reaction
    Collide {
        dominant: ActorId,
        other: ActorId,
        info: ContactInfo,
    },
    /// Glue `other` to `sticky` at a world anchor
    Stick {
        sticky: ActorId,
        other: ActorId,
        anchor: Vec2,
    },
    /// Level-authored task
    Task(Box<dyn FnOnce(&mut Stage)>),
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::Collide { dominant, other, .. } => f
                .debug_struct("Collide")
                .field("dominant", dominant)
                .field("other", other)
                .finish_non_exhaustive(),
            Deferred::Stick { sticky, other, anchor } => f
                .debug_struct("Stick")
                .field("sticky", sticky)
                .field("other", other)
                .field("anchor", anchor)
                .finish(),
            Deferred::Task(_) => f.write_str("Task(..)"),
        }
    }
}

/// FIFO of deferred work
#[derive(Debug, Default)]
pub struct DeferredQueue {
    items: VecDeque<Deferred>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Deferred) {
        self.items.push_back(item);
    }

    /// Oldest pending item
    pub fn pop(&mut self) -> Option<Deferred> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop everything pending (level transition)
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
