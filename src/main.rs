//! Arcade Stage - headless demo
//!
//! Builds a small seeded level, lets a scripted hero run it and records the
//! best completion time as a game fact.
//!
//! Usage: `arcade-stage [settings.json] [seed]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Arcade Stage (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => arcade_stage::StageSettings::load_or_default(path),
        None => arcade_stage::StageSettings::default(),
    };
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x5eed);

    demo::run(settings, seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The demo is native only
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use arcade_stage::Facts;
    use arcade_stage::StageSettings;
    use arcade_stage::audio::{AudioManager, LogBackend};
    use arcade_stage::consts::SIM_DT;
    use arcade_stage::physics::BodyDesc;
    use arcade_stage::sim::{
        ActorId, Destination, Enemy, Goodie, Hero, Obstacle, Outcome, PoolConfig, Side, Stage,
        StageEvent, tick,
    };

    const FACTS_FILE: &str = "arcade_stage_facts.json";
    const MAX_FRAMES: u32 = 60 * 60;
    const RUN_SPEED: f32 = 4.0;
    const LEVEL_LENGTH: f32 = 48.0;

    struct Level {
        hero: ActorId,
        enemies: Vec<ActorId>,
    }

    pub fn run(settings: StageSettings, seed: u64) {
        let mut facts = Facts::load_or_default(FACTS_FILE);
        facts.reset_level();

        let audio = AudioManager::from_settings(LogBackend, &settings);
        let mut stage = Stage::new(settings, audio);
        let level = build_level(&mut stage, seed);
        log::info!(
            "Level built from seed {:#x}: {} actors, {} enemies",
            seed,
            stage.actors().len(),
            level.enemies.len()
        );

        let mut frames = 0;
        while !stage.is_over() && frames < MAX_FRAMES {
            drive_hero(&mut stage, &level, frames);
            tick(&mut stage, SIM_DT);
            for event in stage.drain_events() {
                match event {
                    StageEvent::Disappeared { actor, position } => {
                        log::debug!("{:?} vanished at {:?}", actor, position);
                    }
                    StageEvent::LevelEnded(outcome) => log::info!("Level ended: {:?}", outcome),
                    other => log::trace!("{:?}", other),
                }
            }
            frames += 1;
        }

        let score = stage.score().state();
        log::info!(
            "{:?} after {} frames: {} goodies, {}/{} enemies defeated",
            stage.outcome(),
            frames,
            score.goodies[0],
            score.enemies_defeated,
            score.enemies_created
        );
        record(&mut facts, &stage);
    }

    fn build_level(stage: &mut Stage, seed: u64) -> Level {
        let mut rng = Pcg32::seed_from_u64(seed);

        // Floor and back wall
        stage.add_obstacle(
            &BodyDesc::fixed(LEVEL_LENGTH + 8.0, 1.0).at(LEVEL_LENGTH / 2.0, -0.5),
            Obstacle::default().with_collide_sound("land", 0.5),
        );
        stage.add_obstacle(&BodyDesc::fixed(1.0, 20.0).at(-4.0, 10.0), Obstacle::default());

        let hero = stage.add_hero(
            &BodyDesc::dynamic(0.8, 1.6).at(0.0, 1.0),
            Hero {
                jump_impulse: Vec2::new(0.0, 9.0),
                jump_sound: Some("jump".into()),
                ..Hero::default().with_strength(3).must_survive()
            },
        );

        // Enemies weaken the hero; every third one can be stomped
        let mut enemies = Vec::new();
        let mut x = 8.0;
        while x < LEVEL_LENGTH - 6.0 {
            let enemy = stage.add_enemy(
                &BodyDesc::fixed(0.8, 0.8).at(x, 0.4),
                Enemy {
                    damage: 1,
                    defeat_by_jump: enemies.len() % 3 == 2,
                    ..Default::default()
                },
            );
            stage.set_disappear_sound(enemy, "splat");
            enemies.push(enemy);
            x += rng.random_range(6.0..10.0);
        }

        // Goodies floating over the run
        for _ in 0..6 {
            let gx = rng.random_range(3.0..LEVEL_LENGTH - 3.0);
            let gy = rng.random_range(0.8..2.0);
            stage.add_goodie(
                &BodyDesc::fixed(0.5, 0.5).at(gx, gy).sensor(),
                Goodie::default(),
            );
        }

        // A platform the hero can jump up through
        let ledge = stage.add_obstacle(
            &BodyDesc::fixed(4.0, 0.3).at(LEVEL_LENGTH / 2.0, 2.5),
            Obstacle::default(),
        );
        stage.set_one_sided(ledge, Some(Side::Top));

        stage.add_destination(
            &BodyDesc::fixed(1.0, 2.0).at(LEVEL_LENGTH, 1.0).sensor(),
            Destination {
                arrival_sound: Some("cheer".into()),
                ..Default::default()
            },
        );

        stage.configure_projectiles(&PoolConfig {
            size: 3,
            damage: 1,
            range: 6.0,
            face_travel: true,
            throw_sound: Some("throw".into()),
            disappear_sound: Some("poof".into()),
            ..Default::default()
        });

        stage.score_mut().set_victory_destination(1);
        stage.score_mut().start_stopwatch();
        Level { hero, enemies }
    }

    /// Run right, throw every half second, hop over enemies that are close
    fn drive_hero(stage: &mut Stage, level: &Level, frame: u32) {
        if !stage.is_enabled(level.hero) {
            return;
        }
        let v = stage.velocity(level.hero);
        stage.set_velocity(level.hero, Vec2::new(RUN_SPEED, v.y));

        if frame % 30 == 0 {
            stage.throw_fixed(level.hero, Vec2::new(1.0, 0.2), Vec2::new(12.0, 0.0));
        }

        let x = stage.position(level.hero).x;
        let enemy_close = level.enemies.iter().any(|&e| {
            stage.is_enabled(e) && (stage.position(e).x - x) > 0.0 && (stage.position(e).x - x) < 1.5
        });
        if enemy_close {
            stage.jump(level.hero);
        }
    }

    fn record(facts: &mut Facts, stage: &Stage) {
        facts.put_session("runs", facts.session("runs", 0) + 1);
        if stage.outcome() == Some(Outcome::Won) {
            let millis = stage
                .score()
                .stopwatch()
                .map_or(i64::MAX, |t| (t * 1000.0) as i64);
            if millis < facts.game("best_time_ms", i64::MAX) {
                facts.put_game("best_time_ms", millis);
                log::info!("New best time: {} ms", millis);
            }
            facts.put_game_best("levels_won", facts.game("levels_won", 0) + 1);
        }
        if let Err(e) = facts.save(FACTS_FILE) {
            log::warn!("Could not save facts: {}", e);
        }
    }
}
