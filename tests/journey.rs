use anyhow::Result;
use approx::assert_relative_eq;
use journey_for_water::audio::{SoundEffect, SoundEffects};
use journey_for_water::engine::{Point3, Rect};
use journey_for_water::game_state::{EnergyOptions, GameState, GameStateOwner, GameStore};
use journey_for_water::hazard::{HazardConfig, HazardId, Hazards, PatrolSpec};
use journey_for_water::level::LevelConfig;
use journey_for_water::physics::{Body, Physics, PhysicsConfig, PlayerInput};
use journey_for_water::pickup::{PickupConfig, PickupId, Pickups, Reward};
use journey_for_water::session::{
    JourneyHooks, JourneyLeg, LevelSession, SessionContext, SessionStatus,
};
use journey_for_water::sprite::billboard::FrameSurface;
use journey_for_water::sprite::state::{select, AnimationSnapshot, AnimationState};
use std::cell::RefCell;
use std::rc::Rc;

// ==================== Fixtures ====================
struct Blank;

impl FrameSurface for Blank {
    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn fill(&mut self, _rect: &Rect, _color: &str) -> Result<()> {
        Ok(())
    }

    fn blit(&mut self, _source: &Rect, _destination: &Rect, _mirrored: bool) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Sounds(RefCell<Vec<SoundEffect>>);

impl SoundEffects for Sounds {
    fn play(&self, effect: SoundEffect) {
        self.0.borrow_mut().push(effect);
    }
}

impl Sounds {
    fn count(&self, effect: SoundEffect) -> usize {
        self.0.borrow().iter().filter(|played| **played == effect).count()
    }
}

#[derive(Default)]
struct Completions {
    outbound: u32,
    returned: u32,
}

impl JourneyHooks for Completions {
    fn on_journey_complete(&mut self) {
        self.outbound += 1;
    }

    fn on_return_journey_complete(&mut self) {
        self.returned += 1;
    }
}

fn store_with(energy: f32) -> (GameStore<Rc<Sounds>>, Rc<Sounds>) {
    let sounds = Rc::new(Sounds::default());
    let state = GameState {
        energy,
        ..GameState::default()
    };
    (GameStore::new(state, sounds.clone()), sounds)
}

/// Cheap deterministic noise so the property loops cover varied input
fn wobble(seed: u32) -> f32 {
    let mixed = seed.wrapping_mul(2_654_435_761).rotate_left(13);
    (mixed % 2001) as f32 / 1000.0 - 1.0
}

// ==================== Properties ====================
#[test]
fn energy_never_leaves_its_bounds() {
    let (mut store, _) = store_with(50.0);
    for step in 0..5_000 {
        let delta = wobble(step) * 60.0;
        let change = store.update_energy(delta, EnergyOptions { collision: step % 3 == 0 });
        assert!((0.0..=100.0).contains(&change.after), "{} after {}", change.after, delta);
    }
}

#[test]
fn a_pickup_is_collected_at_most_once() {
    let mut pickups = Pickups::new(
        PickupConfig::default(),
        &[Point3::new(8.0, 1.0, 0.0)],
        &[Point3::new(12.0, 2.0, 0.0)],
        || 0.0,
    );
    for id in [PickupId(0), PickupId(1)] {
        assert!(pickups.collect(id).is_some());
        assert!(pickups.collect(id).is_none());
    }
    assert!(pickups.collect_near(Point3::new(8.0, 1.0, 0.0)).is_empty());
    assert_eq!(pickups.remaining(), 0);
}

#[test]
fn the_player_never_sinks_below_the_ground() {
    let config = LevelConfig::default();
    let physics = Physics::new(PhysicsConfig::default(), config.layout.platforms());
    let mut body = Body::new(config.layout.player_start());
    for step in 0..10_000 {
        let input = PlayerInput {
            axis: wobble(step).signum(),
            jump: step % 37 == 0,
            sprint: step % 5 == 0,
        };
        physics.step(&mut body, input);
        assert!(body.position.y >= 0.6, "sank to {} on step {}", body.position.y, step);
        assert!((0.0..=200.0).contains(&body.position.x));
    }
}

#[test]
fn hazards_stay_inside_their_patrol() {
    let layout = LevelConfig::default().layout;
    let mut hazards = Hazards::new(HazardConfig::default(), &layout.scorpions, &layout.tumbleweeds);
    for _ in 0..10_000 {
        hazards.update(Point3::new(-100.0, 0.0, 0.0));
        for (_, hazard) in hazards.iter() {
            assert!(hazard.position.x >= hazard.patrol_min);
            assert!(hazard.position.x <= hazard.patrol_max);
        }
    }
}

#[test]
fn animation_state_depends_only_on_the_snapshot() {
    let snapshots = [
        (true, 0.0, 0.0),
        (true, 0.0, 0.1),
        (true, 0.0, 0.2),
        (false, 0.3, 0.1),
        (false, -0.3, 0.0),
    ];
    let expected = [
        AnimationState::Idle,
        AnimationState::Walking,
        AnimationState::Running,
        AnimationState::Jumping,
        AnimationState::Falling,
    ];
    for ((on_ground, vertical_velocity, speed), state) in snapshots.into_iter().zip(expected) {
        let snapshot = AnimationSnapshot {
            is_dead: false,
            is_victorious: false,
            is_hit: false,
            is_collecting: false,
            on_ground,
            vertical_velocity,
            speed,
            run_threshold: 0.12,
            moving_threshold: 0.01,
        };
        assert_eq!(select(&snapshot), state);
        assert_eq!(select(&snapshot), select(&snapshot));
    }
}

#[test]
fn a_hazard_hits_at_most_once_per_cooldown() {
    let spec = PatrolSpec {
        x: 10.0,
        y: 1.0,
        min: 10.0,
        max: 10.0,
        speed: 0.0,
    };
    let mut hazards = Hazards::new(HazardConfig::default(), &[spec], &[]);
    let player = Point3::new(10.0, 1.0, 0.0);
    let hit_ticks: Vec<usize> = (0..200)
        .filter(|_| !hazards.update(player).is_empty())
        .collect();
    assert_eq!(hit_ticks, vec![0, 61, 122, 183]);
    assert!(hit_ticks.windows(2).all(|pair| pair[1] - pair[0] > 60));
}

// ==================== Scenarios ====================
#[test]
fn completion_fires_exactly_once_a_second_after_the_finish() {
    let mut config = LevelConfig::default();
    config.layout.player_start = (198.0, 0.6, 0.0);
    config.layout.scorpions.clear();
    config.layout.tumbleweeds.clear();
    let mut session = LevelSession::new(config, JourneyLeg::Outbound, Blank, || 0.0).unwrap();
    let (mut store, sounds) = store_with(100.0);
    let mut completions = Completions::default();

    let mut crossed_on = None;
    let mut announced_on = Vec::new();
    for tick in 0..180 {
        let mut ctx = SessionContext {
            owner: &mut store,
            sound: sounds.as_ref(),
            hooks: &mut completions,
        };
        let report = session
            .tick(PlayerInput { axis: 1.0, ..Default::default() }, &mut ctx)
            .unwrap();
        if report.completed {
            assert!(crossed_on.is_none(), "crossed twice");
            crossed_on = Some(tick);
        }
        if report.announced {
            announced_on.push(tick);
        }
    }
    assert_eq!(crossed_on, Some(0));
    assert_eq!(announced_on, vec![60]);
    assert_eq!(completions.outbound, 1);
    assert_eq!(completions.returned, 0);
    assert_eq!(session.status(), SessionStatus::Complete);
    assert_eq!(session.animation_state(), AnimationState::Victorious);
}

#[test]
fn hit_to_six_energy_warns_once() {
    let (mut store, sounds) = store_with(11.0);
    let change = store.update_energy(-5.0, EnergyOptions { collision: true });
    assert_relative_eq!(store.state().energy, 6.0);
    assert!(change.crossed_low);
    assert_eq!(sounds.count(SoundEffect::LowEnergyWarning), 1);
    assert_eq!(sounds.count(SoundEffect::Hit), 1);
}

#[test]
fn only_the_uncollected_of_two_stacked_pickups_counts() {
    let spot = Point3::new(20.0, 1.0, 0.0);
    let mut pickups = Pickups::new(PickupConfig::default(), &[spot, spot], &[], || 0.0);
    assert!(pickups.collect(PickupId(0)).is_some());

    let (mut store, _) = store_with(100.0);
    let collected = pickups.collect_near(spot);
    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].id, PickupId(1));
    for collection in &collected {
        if let Reward::WaterPoints(points) = collection.reward {
            store.add_water_points(points);
        }
    }
    assert_eq!(store.state().water_points, 1);
}

#[test]
fn a_hazard_at_its_bound_turns_before_moving() {
    let spec = PatrolSpec {
        x: 32.0,
        y: 1.0,
        min: 28.0,
        max: 32.0,
        speed: 0.03,
    };
    let mut hazards = Hazards::new(HazardConfig::default(), &[spec], &[]);
    hazards.update(Point3::new(-100.0, 0.0, 0.0));
    let hazard = hazards.get(HazardId(0)).unwrap();
    assert_relative_eq!(hazard.direction, -1.0);
    assert_relative_eq!(hazard.position.x, 31.97, epsilon = 1e-5);
}
