//! The active level: world, actors, score and the per-frame loop
//!
//! A stage exclusively owns its physics world, deferred queue and projectile
//! pool. Level transitions drop the whole stage; nothing carries over.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::dispatch_begin;
use super::deferred::{Deferred, DeferredQueue};
use super::filter::{filter_contact, ContactView, StickRequests};
use super::pool::ProjectilePool;
use super::score::{Outcome, ScoreTracker};
use super::state::*;
use super::sticky::StickyJointManager;
use crate::audio::SoundPlayer;
use crate::physics::{Bodies, BodyDesc, BodyHandle, Contact, ContactEvent, ContactListener, World};
use crate::settings::StageSettings;

/// Something the render layer should react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageEvent {
    /// An actor was removed with its disappearance effect
    Disappeared { actor: ActorId, position: Vec2 },
    /// A thrower just launched a projectile
    ThrowAnimation { thrower: ActorId },
    /// An actor now faces `angle` radians
    FacingChanged { actor: ActorId, angle: f32 },
    LevelEnded(Outcome),
}

/// One level in play
pub struct Stage {
    pub(super) world: World,
    pub(super) actors: Vec<Actor>,
    body_index: HashMap<BodyHandle, ActorId>,
    pub(super) score: ScoreTracker,
    pub(super) pool: Option<ProjectilePool>,
    pub(super) sticky: StickyJointManager,
    pub(super) deferred: DeferredQueue,
    pub(super) audio: Box<dyn SoundPlayer>,
    pub(super) events: Vec<StageEvent>,
    pub(super) settings: StageSettings,
    outcome: Option<Outcome>,
    /// Simulated seconds since the stage started
    pub(super) now: f32,
    /// Unsimulated frame time (catch-up stepping only)
    pub(super) accumulator: f32,
    frame: u64,
}

impl Stage {
    pub fn new(settings: StageSettings, audio: impl SoundPlayer + 'static) -> Self {
        let settings = settings.sanitized();
        let mut score = ScoreTracker::new();
        score.reset();
        log::info!(
            "Stage created (gravity {:?}, substep {:.4}s, {} stepping)",
            settings.gravity,
            settings.substep,
            settings.step_policy.as_str()
        );
        Self {
            world: World::new(settings.gravity),
            actors: Vec::new(),
            body_index: HashMap::new(),
            score,
            pool: None,
            sticky: StickyJointManager::new(),
            deferred: DeferredQueue::new(),
            audio: Box::new(audio),
            events: Vec::new(),
            settings,
            outcome: None,
            now: 0.0,
            accumulator: 0.0,
            frame: 0,
        }
    }

    // === Building the level ===

    /// Create a body and bind it to a role
    pub fn add_actor(&mut self, desc: &BodyDesc, role: Role) -> ActorId {
        let body = self.world.create_body(desc);
        let id = ActorId(self.actors.len() as u32);
        match role.kind() {
            RoleKind::Hero => self.score.on_hero_created(),
            RoleKind::Enemy => self.score.on_enemy_created(),
            _ => {}
        }
        log::trace!("{:?} created as {:?} at {:?}", id, role.kind(), desc.position);
        self.actors.push(Actor {
            id,
            body,
            role,
            enabled: true,
            traits: ContactTraits {
                stick_delay: self.settings.stick_delay,
                ..Default::default()
            },
            disappear_sound: None,
        });
        self.body_index.insert(body, id);
        id
    }

    pub fn add_hero(&mut self, desc: &BodyDesc, hero: Hero) -> ActorId {
        self.add_actor(desc, Role::Hero(hero))
    }

    pub fn add_enemy(&mut self, desc: &BodyDesc, enemy: Enemy) -> ActorId {
        self.add_actor(desc, Role::Enemy(enemy))
    }

    pub fn add_goodie(&mut self, desc: &BodyDesc, goodie: Goodie) -> ActorId {
        self.add_actor(desc, Role::Goodie(goodie))
    }

    pub fn add_destination(&mut self, desc: &BodyDesc, destination: Destination) -> ActorId {
        self.add_actor(desc, Role::Destination(destination))
    }

    pub fn add_obstacle(&mut self, desc: &BodyDesc, obstacle: Obstacle) -> ActorId {
        self.add_actor(desc, Role::Obstacle(obstacle))
    }

    /// A body with no actor; its contacts are never dispatched or filtered
    pub fn add_scenery(&mut self, desc: &BodyDesc) -> BodyHandle {
        self.world.create_body(desc)
    }

    pub fn set_sticky_sides(&mut self, id: ActorId, sides: &[Side]) {
        if let Some(actor) = self.actor_mut(id) {
            actor.traits.sticky_sides = [false; 4];
            for side in sides {
                actor.traits.sticky_sides[side.index()] = true;
            }
        }
    }

    pub fn set_one_sided(&mut self, id: ActorId, side: Option<Side>) {
        if let Some(actor) = self.actor_mut(id) {
            actor.traits.one_sided = side;
        }
    }

    pub fn set_pass_through(&mut self, id: ActorId, group: u32) {
        if let Some(actor) = self.actor_mut(id) {
            actor.traits.pass_through = group;
        }
    }

    pub fn set_stick_delay(&mut self, id: ActorId, seconds: f32) {
        if let Some(actor) = self.actor_mut(id) {
            actor.traits.stick_delay = seconds.max(0.0);
        }
    }

    pub fn set_disappear_sound(&mut self, id: ActorId, sound: &str) {
        if let Some(actor) = self.actor_mut(id) {
            actor.disappear_sound = Some(sound.to_string());
        }
    }

    // === Lookup ===

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id.0 as usize)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        let found = self.actors.get_mut(id.0 as usize);
        if found.is_none() {
            log::warn!("Unknown actor {:?}", id);
        }
        found
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// The actor bound to a body, if any
    pub fn actor_of(&self, body: BodyHandle) -> Option<ActorId> {
        self.body_index.get(&body).copied()
    }

    pub fn is_enabled(&self, id: ActorId) -> bool {
        self.actor(id).is_some_and(|a| a.enabled)
    }

    pub fn position(&self, id: ActorId) -> Vec2 {
        self.actor(id)
            .map(|a| self.world.position(a.body))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn velocity(&self, id: ActorId) -> Vec2 {
        self.actor(id)
            .map(|a| self.world.velocity(a.body))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn set_velocity(&mut self, id: ActorId, velocity: Vec2) {
        if let Some(body) = self.actor(id).map(|a| a.body) {
            self.world.set_velocity(body, velocity);
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn score(&self) -> &ScoreTracker {
        &self.score
    }

    pub fn score_mut(&mut self) -> &mut ScoreTracker {
        &mut self.score
    }

    pub fn sticky(&self) -> &StickyJointManager {
        &self.sticky
    }

    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Simulated seconds since the stage started
    pub fn now(&self) -> f32 {
        self.now
    }

    /// Physics steps taken so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Deferred items waiting for the next drain
    pub fn pending(&self) -> usize {
        self.deferred.len()
    }

    /// Take every presentation event recorded since the last call
    pub fn drain_events(&mut self) -> Vec<StageEvent> {
        std::mem::take(&mut self.events)
    }

    // === Shared actions ===

    /// Disable an actor and its body. A non-quiet removal plays the actor's
    /// disappear sound and records a `Disappeared` event.
    pub fn remove_actor(&mut self, id: ActorId, quiet: bool) {
        let Some(actor) = self.actor_mut(id) else {
            return;
        };
        if !actor.enabled {
            return;
        }
        actor.enabled = false;
        let body = actor.body;
        let sound = actor.disappear_sound.clone();

        self.sticky.detach_all(&mut self.world, id);
        self.world.set_enabled(body, false);
        log::debug!("{:?} removed{}", id, if quiet { " quietly" } else { "" });

        if !quiet {
            if let Some(sound) = sound {
                self.audio.play(&sound);
            }
            let position = self.world.position(body);
            self.events.push(StageEvent::Disappeared { actor: id, position });
        }
    }

    /// Queue work to run after the current physics step, behind everything
    /// already queued
    pub fn defer(&mut self, task: impl FnOnce(&mut Stage) + 'static) {
        self.deferred.push(Deferred::Task(Box::new(task)));
    }

    /// Break every sticky link of an actor. Each released partner may not
    /// stick again for its own stick delay.
    pub fn unstick(&mut self, id: ActorId) {
        let released = self.sticky.detach_all(&mut self.world, id);
        let now = self.now;
        for link in released {
            if let Some(partner) = self.actors.get_mut(link.other.0 as usize) {
                partner.traits.stick_cooldown_until = now + partner.traits.stick_delay;
            }
        }
    }

    /// End the level. Only the first call has any effect; returns whether
    /// this call decided the outcome.
    pub fn end_level(&mut self, outcome: Outcome) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(outcome);
        self.deferred.clear();
        log::info!("Level {:?} at {:.2}s (frame {})", outcome, self.now, self.frame);

        let sound = match outcome {
            Outcome::Won => self.settings.win_sound.clone(),
            Outcome::Lost => self.settings.lose_sound.clone(),
        };
        if let Some(sound) = sound {
            self.audio.play(&sound);
        }
        self.events.push(StageEvent::LevelEnded(outcome));
        true
    }

    /// Latch an outcome signalled by the score tracker
    pub(super) fn signal(&mut self, outcome: Option<Outcome>) {
        if let Some(outcome) = outcome {
            self.end_level(outcome);
        }
    }

    pub(super) fn play(&mut self, sound: Option<&str>) {
        if let Some(sound) = sound {
            self.audio.play(sound);
        }
    }

    // === Frame ===

    /// One fixed step: physics, deferred reactions, then timers. Does nothing
    /// once the level has ended.
    pub fn step(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let dt = self.settings.substep;

        let filter = StepFilter {
            views: self.contact_views(),
            sticky: &self.sticky,
            now: self.now,
            requests: Mutex::new(StickRequests::default()),
        };
        let events = self.world.step(dt, &filter);
        let requests = filter
            .requests
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        for event in events {
            match event {
                ContactEvent::Began(contact) => self.begin_contact(&contact),
                ContactEvent::Ended(a, b) => log::trace!("Contact {:?}/{:?} ended", a, b),
            }
        }
        for request in requests.into_vec() {
            self.deferred.push(Deferred::Stick {
                sticky: request.sticky,
                other: request.other,
                anchor: request.anchor,
            });
        }

        self.drain_deferred();
        self.now += dt;
        self.frame += 1;
        if self.outcome.is_some() {
            return;
        }

        self.check_projectile_ranges();
        self.advance_timers(dt);
    }

    /// Filter data of every enabled actor, indexed by body handle
    fn contact_views(&self) -> Vec<Option<ContactView>> {
        let mut views = vec![None; self.world.body_count()];
        for actor in self.actors.iter().filter(|a| a.enabled) {
            if let Some(slot) = views.get_mut(actor.body.0 as usize) {
                *slot = Some(ContactView::from(actor));
            }
        }
        views
    }

    /// Classify a contact that began this step and queue the reaction
    fn begin_contact(&mut self, contact: &Contact) {
        let (Some(a), Some(b)) = (
            self.actor_of(contact.body_a).and_then(|id| self.actor(id)),
            self.actor_of(contact.body_b).and_then(|id| self.actor(id)),
        ) else {
            log::trace!("Ignoring contact without two actors");
            return;
        };
        if let Some(item) = dispatch_begin(a, b, contact) {
            self.deferred.push(item);
        }
    }

    /// Run queued work in scheduling order, including work queued while
    /// draining
    fn drain_deferred(&mut self) {
        while let Some(item) = self.deferred.pop() {
            match item {
                Deferred::Collide {
                    dominant,
                    other,
                    info,
                } => self.on_collide(dominant, other, &info),
                Deferred::Stick {
                    sticky,
                    other,
                    anchor,
                } => self.apply_stick(sticky, other, anchor),
                Deferred::Task(task) => task(self),
            }
            if self.outcome.is_some() {
                self.deferred.clear();
            }
        }
    }

    fn apply_stick(&mut self, sticky: ActorId, other: ActorId, anchor: Vec2) {
        let (Some(s), Some(o)) = (self.actor(sticky), self.actor(other)) else {
            return;
        };
        if !s.enabled || !o.enabled {
            return;
        }
        let (s, o) = ((s.id, s.body), (o.id, o.body));
        self.sticky.attach(&mut self.world, s, o, anchor);
    }

    fn advance_timers(&mut self, dt: f32) {
        for actor in self.actors.iter_mut().filter(|a| a.enabled) {
            if let Role::Hero(hero) = &mut actor.role {
                hero.invincible_remaining = (hero.invincible_remaining - dt).max(0.0);
            }
        }
        let outcome = self.score.advance(dt);
        self.signal(outcome);
    }
}

/// Pre-solve filtering for one physics step. Actor data is snapshotted
/// because the listener runs inside the physics pipeline.
struct StepFilter<'a> {
    views: Vec<Option<ContactView>>,
    sticky: &'a StickyJointManager,
    now: f32,
    requests: Mutex<StickRequests>,
}

impl ContactListener for StepFilter<'_> {
    fn pre_solve(&self, contact: &mut Contact, bodies: &Bodies<'_>) {
        let view = |body: BodyHandle| self.views.get(body.0 as usize).copied().flatten();
        let (Some(a), Some(b)) = (view(contact.body_a), view(contact.body_b)) else {
            return;
        };
        if let Some(request) = filter_contact(&a, &b, contact, bodies, self.sticky, self.now) {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .offer(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioManager, Silence, SoundLog};

    fn stage() -> Stage {
        Stage::new(StageSettings::default(), Silence)
    }

    #[test]
    fn test_new_stage_has_clean_score() {
        let stage = stage();
        assert_eq!(stage.score().state().heroes_created, 0);
        assert_eq!(stage.outcome(), None);
        assert_eq!(stage.now(), 0.0);
    }

    #[test]
    fn test_add_actor_counts_heroes_and_enemies() {
        let mut stage = stage();
        stage.add_hero(&BodyDesc::dynamic(1.0, 1.0), Hero::default());
        stage.add_enemy(&BodyDesc::fixed(1.0, 1.0).at(5.0, 0.0), Enemy::default());
        stage.add_enemy(&BodyDesc::fixed(1.0, 1.0).at(9.0, 0.0), Enemy::default());
        let state = stage.score().state();
        assert_eq!(state.heroes_created, 1);
        assert_eq!(state.enemies_created, 2);
    }

    #[test]
    fn test_scenery_has_no_actor() {
        let mut stage = stage();
        let body = stage.add_scenery(&BodyDesc::fixed(10.0, 1.0));
        assert_eq!(stage.actor_of(body), None);
        let hero = stage.add_hero(&BodyDesc::dynamic(1.0, 1.0).at(0.0, 3.0), Hero::default());
        let hero_body = stage.actor(hero).map(|a| a.body);
        assert_eq!(hero_body.and_then(|b| stage.actor_of(b)), Some(hero));
    }

    #[test]
    fn test_remove_actor_is_idempotent_and_noisy_once() {
        let log = SoundLog::new();
        let mut stage = Stage::new(StageSettings::default(), AudioManager::new(log.clone()));
        let goodie = stage.add_goodie(&BodyDesc::fixed(1.0, 1.0), Goodie::default());
        stage.set_disappear_sound(goodie, "pop");
        stage.remove_actor(goodie, false);
        stage.remove_actor(goodie, false);
        assert_eq!(log.count("pop"), 1);
        assert!(!stage.is_enabled(goodie));
        assert_eq!(stage.drain_events().len(), 1);
        assert!(stage.drain_events().is_empty());
    }

    #[test]
    fn test_quiet_removal_is_silent() {
        let log = SoundLog::new();
        let mut stage = Stage::new(StageSettings::default(), AudioManager::new(log.clone()));
        let goodie = stage.add_goodie(&BodyDesc::fixed(1.0, 1.0), Goodie::default());
        stage.set_disappear_sound(goodie, "pop");
        stage.remove_actor(goodie, true);
        assert_eq!(log.count("pop"), 0);
        assert!(stage.drain_events().is_empty());
    }

    #[test]
    fn test_deferred_tasks_run_in_order_after_step() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut stage = stage();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let order = Rc::clone(&order);
            stage.defer(move |s| {
                order.borrow_mut().push(i);
                if i == 0 {
                    let order = Rc::clone(&order);
                    s.defer(move |_| order.borrow_mut().push(99));
                }
            });
        }
        assert_eq!(stage.pending(), 3);
        stage.step();
        assert_eq!(*order.borrow(), vec![0, 1, 2, 99]);
        assert_eq!(stage.pending(), 0);
    }

    #[test]
    fn test_end_level_latches_first_outcome() {
        let log = SoundLog::new();
        let settings = StageSettings {
            win_sound: Some("fanfare".into()),
            lose_sound: Some("sad".into()),
            ..Default::default()
        };
        let mut stage = Stage::new(settings, AudioManager::new(log.clone()));
        stage.defer(|_| {});
        assert!(stage.end_level(Outcome::Won));
        assert!(!stage.end_level(Outcome::Lost));
        assert_eq!(stage.outcome(), Some(Outcome::Won));
        assert_eq!(stage.pending(), 0);
        assert_eq!(log.names(), vec!["fanfare".to_string()]);

        let frame = stage.frame();
        stage.step();
        assert_eq!(stage.frame(), frame);
    }

    #[test]
    fn test_lose_countdown_ends_level() {
        let mut stage = stage();
        stage.score_mut().set_lose_countdown(0.1);
        for _ in 0..10 {
            stage.step();
        }
        assert_eq!(stage.outcome(), Some(Outcome::Lost));
        assert!(stage
            .drain_events()
            .contains(&StageEvent::LevelEnded(Outcome::Lost)));
    }
}
