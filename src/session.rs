use crate::audio::{SoundEffect, SoundEffects};
use crate::camera::{Camera, Viewport};
use crate::engine::{ms_to_ticks, Point};
use crate::game_state::{EnergyChange, EnergyOptions, GameState, GameStateOwner, TimeOfDay};
use crate::hazard::{HazardHit, Hazards};
use crate::level::LevelConfig;
use crate::physics::{Body, Physics, PlayerInput};
use crate::pickup::{Collection, Pickups, Reward};
use crate::sprite::billboard::{FrameSurface, SpriteBillboard};
use crate::sprite::state::{AnimationSnapshot, AnimationState, CharacterAnimator, CharacterState};
use crate::sprite::JOURNEY_CLIPS;
use anyhow::Result;

// ==================== Level Session ====================
// ELI5: everything one attempt at one leg of the journey owns
// - entities live here, energy and water live with the owner
// - the owner, the sound service and the app hooks are lent to every tick
//
// TABLE: one tick, always in this order
// ┌────┬──────────────────────────────┬──────────────────────────────────┐
// │ #  │ step                         │ only while playing               │
// ├────┼──────────────────────────────┼──────────────────────────────────┤
// │ 1  │ physics + motion flags       │ yes                              │
// │ 2  │ hit / collect countdowns     │ no                               │
// │ 3  │ energy drain                 │ yes                              │
// │ 4  │ pickups (float, proximity)   │ float always, collect if playing │
// │ 5  │ hazards (patrol, damage)     │ yes                              │
// │ 6  │ camera + parallax            │ no                               │
// │ 7  │ completion announcement      │ no, counts down once frozen      │
// │    │ game over, then completion   │ yes                              │
// │ 8  │ animation + billboard        │ no                               │
// │ 9  │ clear one-tick edges         │ no                               │
// └────┴──────────────────────────────┴──────────────────────────────────┘

/// Speed above which the player counts as moving, in units per tick
const MOVING_THRESHOLD: f32 = 0.01;
/// Running starts a little above plain walking speed
const RUN_THRESHOLD_FACTOR: f32 = 1.2;
/// Victory pose time between reaching the end and telling the app
const COMPLETION_DELAY_MS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JourneyLeg {
    /// walking out to the water source
    #[default]
    Outbound,
    /// carrying the water back home
    Return,
}

impl JourneyLeg {
    pub fn parse(leg: &str) -> Option<Self> {
        match leg {
            "outbound" => Some(JourneyLeg::Outbound),
            "return" => Some(JourneyLeg::Return),
            _ => None,
        }
    }

    pub fn time_of_day(self) -> TimeOfDay {
        match self {
            JourneyLeg::Outbound => TimeOfDay::Morning,
            JourneyLeg::Return => TimeOfDay::Afternoon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Playing,
    /// reached the end of the level, the world is frozen
    Complete,
    /// ran out of energy, the world is frozen
    GameOver,
}

/// Notifications for the surrounding app, all optional
pub trait JourneyHooks {
    fn on_journey_complete(&mut self) {}
    fn on_return_journey_complete(&mut self) {}
    fn on_game_over(&mut self) {}
    fn on_low_energy(&mut self, _energy: f32) {}
    /// The persisted record changed, the HUD and the save layer follow it
    fn on_state_changed(&mut self, _state: &GameState) {}
}

/// For callers that do not care about any notification
pub struct NoHooks;

impl JourneyHooks for NoHooks {}

/// A hook call held back until the tick is over
#[derive(Debug, Clone, PartialEq)]
pub enum JourneyNotice {
    JourneyComplete,
    ReturnJourneyComplete,
    GameOver,
    LowEnergy(f32),
    StateChanged(GameState),
}

impl JourneyNotice {
    pub fn deliver(self, hooks: &mut dyn JourneyHooks) {
        match self {
            JourneyNotice::JourneyComplete => hooks.on_journey_complete(),
            JourneyNotice::ReturnJourneyComplete => hooks.on_return_journey_complete(),
            JourneyNotice::GameOver => hooks.on_game_over(),
            JourneyNotice::LowEnergy(energy) => hooks.on_low_energy(energy),
            JourneyNotice::StateChanged(state) => hooks.on_state_changed(&state),
        }
    }
}

/// Queue notices while the owner is borrowed, deliver them afterwards
impl JourneyHooks for Vec<JourneyNotice> {
    fn on_journey_complete(&mut self) {
        self.push(JourneyNotice::JourneyComplete);
    }

    fn on_return_journey_complete(&mut self) {
        self.push(JourneyNotice::ReturnJourneyComplete);
    }

    fn on_game_over(&mut self) {
        self.push(JourneyNotice::GameOver);
    }

    fn on_low_energy(&mut self, energy: f32) {
        self.push(JourneyNotice::LowEnergy(energy));
    }

    fn on_state_changed(&mut self, state: &GameState) {
        self.push(JourneyNotice::StateChanged(state.clone()));
    }
}

/// What a tick borrows from outside the session
pub struct SessionContext<'a> {
    pub owner: &'a mut dyn GameStateOwner,
    pub sound: &'a dyn SoundEffects,
    pub hooks: &'a mut dyn JourneyHooks,
}

impl SessionContext<'_> {
    /// Hand the owner's current record to the app
    fn publish_state(&mut self) {
        self.hooks.on_state_changed(self.owner.state());
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub jumped: bool,
    pub landed: bool,
    pub collections: Vec<Collection>,
    pub hits: Vec<HazardHit>,
    /// reached the end this tick, the app hears about it later
    pub completed: bool,
    /// the completion hooks fired this tick
    pub announced: bool,
    pub game_over: bool,
}

pub struct LevelSession<S: FrameSurface> {
    config: LevelConfig,
    leg: JourneyLeg,
    status: SessionStatus,
    physics: Physics,
    body: Body,
    pickups: Pickups,
    hazards: Hazards,
    camera: Camera,
    character: CharacterState,
    animator: CharacterAnimator,
    billboard: SpriteBillboard<S>,
    /// ticks until the next timed drain, 0 drains on the coming tick
    drain_countdown: u32,
    /// ticks left before the completion hooks fire, None when not pending
    completion_countdown: Option<u32>,
}

impl<S: FrameSurface> LevelSession<S> {
    /// Build every entity from `config`
    /// - `phase` seeds the orb float cycles, `pickup::random_phase` in the browser
    pub fn new(
        config: LevelConfig,
        leg: JourneyLeg,
        surface: S,
        phase: impl FnMut() -> f32,
    ) -> Result<Self> {
        let layout = &config.layout;
        let start = layout.player_start();
        let physics = Physics::new(config.physics.clone(), layout.platforms());
        let pickups = Pickups::new(
            config.pickups.clone(),
            &layout.jerry_cans(),
            &layout.energy_orbs(),
            phase,
        );
        let hazards = Hazards::new(config.hazards.clone(), &layout.scorpions, &layout.tumbleweeds);
        let camera = Camera::new(&config.camera, config.physics.level_width, start.x);
        let mut billboard =
            SpriteBillboard::new(surface, config.sprite_sheet.clone(), config.billboard.clone());
        billboard.sync_position(start);

        log!(
            "Level built: {} platforms, {} pickups, {} hazards ({:?})",
            physics.platforms().count(),
            pickups.len(),
            hazards.iter().count(),
            leg
        );

        Ok(LevelSession {
            leg,
            status: SessionStatus::Playing,
            physics,
            body: Body::new(start),
            pickups,
            hazards,
            camera,
            character: CharacterState::default(),
            animator: CharacterAnimator::new(&JOURNEY_CLIPS)?,
            billboard,
            drain_countdown: 0,
            completion_countdown: None,
            config,
        })
    }

    /// Tell the owner which part of the day this leg happens in
    pub fn begin(&mut self, ctx: &mut SessionContext) {
        ctx.owner.set_time_of_day(self.leg.time_of_day());
        ctx.publish_state();
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn leg(&self) -> JourneyLeg {
        self.leg
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn pickups(&self) -> &Pickups {
        &self.pickups
    }

    pub fn hazards(&self) -> &Hazards {
        &self.hazards
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn character(&self) -> &CharacterState {
        &self.character
    }

    pub fn animation_state(&self) -> AnimationState {
        self.animator.state()
    }

    pub fn billboard(&self) -> &SpriteBillboard<S> {
        &self.billboard
    }

    pub fn billboard_mut(&mut self) -> &mut SpriteBillboard<S> {
        &mut self.billboard
    }

    pub fn tick(&mut self, input: PlayerInput, ctx: &mut SessionContext) -> Result<TickReport> {
        let mut report = TickReport::default();
        let playing = self.status == SessionStatus::Playing;
        let moving = playing && input.axis.is_finite() && input.axis != 0.0;

        if playing {
            let outcome = self.physics.step(&mut self.body, input);
            if outcome.jumped {
                ctx.sound.play(SoundEffect::Jump);
            }
            report.jumped = outcome.jumped;
            report.landed = outcome.landed;
            self.character.facing = self.body.facing;
            self.character
                .observe_motion(moving, moving && input.sprint, outcome.jumped, outcome.landed);
        } else {
            self.character.observe_motion(false, false, false, false);
        }
        self.character.tick_timers();

        if playing {
            self.drain_energy(moving, ctx);
        }

        self.pickups.animate();
        if playing {
            for collection in self.pickups.collect_near(self.body.position) {
                self.apply_reward(&collection, ctx);
                report.collections.push(collection);
            }

            for hit in self.hazards.update(self.body.position) {
                log!("Hit by {:?} for {} energy", hit.kind, hit.damage);
                let change = ctx
                    .owner
                    .update_energy(-hit.damage, EnergyOptions { collision: true });
                Self::note_change(&change, ctx);
                self.note_energy(change, ctx);
                self.character.arm_hit();
                report.hits.push(hit);
            }
        }

        self.camera.follow(self.body.position.x);

        report.announced = self.advance_completion(ctx);
        if playing {
            // an empty tank on the finishing tick still ends the journey
            report.game_over = self.check_game_over(ctx);
            report.completed = self.check_completion();
        }
        self.character.is_dead = ctx.owner.state().energy <= 0.0;

        self.animate()?;
        self.character.reset_edges();
        Ok(report)
    }

    /// A tap landing on a pickup collects it right away
    /// - misses, collected pickups and a frozen world are all no-ops
    pub fn handle_tap(
        &mut self,
        point: Point,
        viewport: &Viewport,
        ctx: &mut SessionContext,
    ) -> Option<Collection> {
        if self.status != SessionStatus::Playing {
            return None;
        }
        let id = self
            .pickups
            .pick(point, |bounds, z| viewport.project_bounds(bounds, z))?;
        let collection = self.pickups.collect(id)?;
        self.apply_reward(&collection, ctx);
        Some(collection)
    }

    /// Put the level back the way it was built and refill energy
    pub fn restart(&mut self, ctx: &mut SessionContext) -> Result<()> {
        log!("Restarting level");
        ctx.owner.refill_energy();
        ctx.owner.set_time_of_day(self.leg.time_of_day());
        ctx.publish_state();
        self.body = Body::new(self.config.layout.player_start());
        self.pickups.reset();
        self.hazards.reset();
        self.camera.reset();
        self.character = CharacterState::default();
        self.animator.reset()?;
        self.billboard.sync_position(self.body.position);
        self.drain_countdown = 0;
        self.completion_countdown = None;
        self.status = SessionStatus::Playing;
        Ok(())
    }

    /// Rebuild what a failed tick may have left half-updated
    /// - a body that went non-finite goes back to the start
    /// - animation restarts from idle
    pub fn recover(&mut self) -> Result<()> {
        let position = self.body.position;
        if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
            error!("Player position was corrupted, moving back to start");
            self.body = Body::new(self.config.layout.player_start());
        }
        let dead = self.character.is_dead;
        let victorious = self.character.is_victorious;
        self.character = CharacterState {
            is_dead: dead,
            is_victorious: victorious,
            facing: self.body.facing,
            ..CharacterState::default()
        };
        self.animator.reset()?;
        self.billboard.sync_position(self.body.position);
        Ok(())
    }

    fn drain_energy(&mut self, moving: bool, ctx: &mut SessionContext) {
        let energy = &self.config.energy;
        if self.drain_countdown == 0 {
            let change = ctx
                .owner
                .update_energy(-energy.drain_rate, EnergyOptions::default());
            Self::note_change(&change, ctx);
            self.note_energy(change, ctx);
            self.drain_countdown = ms_to_ticks(energy.drain_interval_ms).max(1);
        }
        self.drain_countdown -= 1;

        if moving {
            let change = ctx
                .owner
                .update_energy(-energy.movement_cost, EnergyOptions::default());
            Self::note_change(&change, ctx);
            self.note_energy(change, ctx);
        }
    }

    fn apply_reward(&mut self, collection: &Collection, ctx: &mut SessionContext) {
        match collection.reward {
            Reward::WaterPoints(points) => {
                log!("Collected jerry can {:?}", collection.id);
                ctx.owner.add_water_points(points);
                ctx.publish_state();
            }
            Reward::Energy(amount) => {
                log!("Collected energy orb {:?}", collection.id);
                let change = ctx.owner.update_energy(amount, EnergyOptions::default());
                Self::note_change(&change, ctx);
                self.note_energy(change, ctx);
            }
        }
        self.character.arm_collect();
    }

    /// Energy already at a bound does not change, and nobody needs telling
    fn note_change(change: &EnergyChange, ctx: &mut SessionContext) {
        if change.after != change.before {
            ctx.publish_state();
        }
    }

    fn note_energy(&self, change: EnergyChange, ctx: &mut SessionContext) {
        if change.crossed_low {
            ctx.hooks.on_low_energy(change.after);
        }
    }

    /// Freeze in the victory pose, the hooks wait for the countdown
    fn check_completion(&mut self) -> bool {
        if self.status != SessionStatus::Playing
            || self.body.position.x < self.config.completion_x()
        {
            return false;
        }
        log!("Journey leg complete at x = {}", self.body.position.x);
        self.freeze(SessionStatus::Complete);
        self.character.is_victorious = true;
        self.completion_countdown = Some(ms_to_ticks(COMPLETION_DELAY_MS));
        true
    }

    /// True on the one tick the completion hooks fire
    fn advance_completion(&mut self, ctx: &mut SessionContext) -> bool {
        let Some(left) = self.completion_countdown else {
            return false;
        };
        let left = left.saturating_sub(1);
        if left > 0 {
            self.completion_countdown = Some(left);
            return false;
        }
        self.completion_countdown = None;
        match self.leg {
            JourneyLeg::Outbound => ctx.hooks.on_journey_complete(),
            JourneyLeg::Return => {
                ctx.sound.play(SoundEffect::DayComplete);
                ctx.hooks.on_return_journey_complete();
            }
        }
        true
    }

    fn check_game_over(&mut self, ctx: &mut SessionContext) -> bool {
        if self.status != SessionStatus::Playing || ctx.owner.state().energy > 0.0 {
            return false;
        }
        log!("Out of energy, game over");
        self.freeze(SessionStatus::GameOver);
        ctx.hooks.on_game_over();
        true
    }

    fn freeze(&mut self, status: SessionStatus) {
        self.status = status;
        self.body.velocity = Point::default();
    }

    fn animate(&mut self) -> Result<()> {
        let move_speed = self.physics.config().move_speed;
        let snapshot = AnimationSnapshot {
            is_dead: self.character.is_dead,
            is_victorious: self.character.is_victorious,
            is_hit: self.character.is_hit,
            is_collecting: self.character.is_collecting,
            on_ground: self.body.on_ground,
            vertical_velocity: self.body.velocity.y,
            speed: self.body.speed(),
            run_threshold: move_speed * RUN_THRESHOLD_FACTOR,
            moving_threshold: MOVING_THRESHOLD,
        };
        self.animator.update(&snapshot)?;
        self.billboard
            .render_frame(self.animator.frame(), self.body.facing)?;
        self.billboard.sync_position(self.body.position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Point3, Rect, Size};
    use crate::game_state::{GameState, GameStore};
    use crate::pickup::{PickupId, PickupKind};
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

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

    #[derive(Default)]
    struct Calls {
        complete: u32,
        return_complete: u32,
        game_over: u32,
        low_energy: u32,
        states: Vec<GameState>,
    }

    impl JourneyHooks for Calls {
        fn on_journey_complete(&mut self) {
            self.complete += 1;
        }

        fn on_return_journey_complete(&mut self) {
            self.return_complete += 1;
        }

        fn on_game_over(&mut self) {
            self.game_over += 1;
        }

        fn on_low_energy(&mut self, _energy: f32) {
            self.low_energy += 1;
        }

        fn on_state_changed(&mut self, state: &GameState) {
            self.states.push(state.clone());
        }
    }

    struct Harness {
        session: LevelSession<Blank>,
        store: GameStore<Rc<Sounds>>,
        /// shared by the store and the session
        sounds: Rc<Sounds>,
        calls: Calls,
    }

    impl Harness {
        fn new(config: LevelConfig, leg: JourneyLeg) -> Self {
            let sounds = Rc::new(Sounds::default());
            Harness {
                session: LevelSession::new(config, leg, Blank, || 0.0).unwrap(),
                store: GameStore::new(GameState::default(), sounds.clone()),
                sounds,
                calls: Calls::default(),
            }
        }

        fn tick(&mut self, input: PlayerInput) -> TickReport {
            let mut ctx = SessionContext {
                owner: &mut self.store,
                sound: self.sounds.as_ref(),
                hooks: &mut self.calls,
            };
            self.session.tick(input, &mut ctx).unwrap()
        }

        /// Tap straight onto a point of the world, seen from the live camera
        fn tap(&mut self, target: Point3) -> Option<Collection> {
            let screen = Size {
                width: 800.0,
                height: 600.0,
            };
            let viewport =
                Viewport::new(&self.session.config().camera, self.session.camera().x, screen);
            let point = viewport.project(target);
            let mut ctx = SessionContext {
                owner: &mut self.store,
                sound: self.sounds.as_ref(),
                hooks: &mut self.calls,
            };
            self.session.handle_tap(point, &viewport, &mut ctx)
        }

        fn energy(&self) -> f32 {
            self.store.state().energy
        }

        fn heard(&self, effect: SoundEffect) -> bool {
            self.sounds.0.borrow().contains(&effect)
        }
    }

    /// Flat, empty level so only the piece under test acts
    fn bare_level() -> LevelConfig {
        let mut config = LevelConfig::default();
        config.layout.platforms.clear();
        config.layout.jerry_cans.clear();
        config.layout.energy_orbs.clear();
        config.layout.scorpions.clear();
        config.layout.tumbleweeds.clear();
        config
    }

    fn right() -> PlayerInput {
        PlayerInput { axis: 1.0, ..Default::default() }
    }

    #[test]
    fn first_tick_drains_then_once_per_second() {
        let mut harness = Harness::new(bare_level(), JourneyLeg::Outbound);
        harness.tick(PlayerInput::default());
        assert_relative_eq!(harness.energy(), 99.5);
        for _ in 1..60 {
            harness.tick(PlayerInput::default());
        }
        assert_relative_eq!(harness.energy(), 99.5);
        harness.tick(PlayerInput::default());
        assert_relative_eq!(harness.energy(), 99.0);
    }

    #[test]
    fn moving_costs_energy_every_tick() {
        let mut harness = Harness::new(bare_level(), JourneyLeg::Outbound);
        harness.tick(right());
        harness.tick(right());
        assert_relative_eq!(harness.energy(), 100.0 - 0.5 - 0.2 * 2.0, epsilon = 1e-4);
    }

    #[test]
    fn jump_plays_its_cue() {
        let mut harness = Harness::new(bare_level(), JourneyLeg::Outbound);
        // settle onto the ground plane first
        for _ in 0..30 {
            harness.tick(PlayerInput::default());
        }
        let report = harness.tick(PlayerInput { jump: true, ..Default::default() });
        assert!(report.jumped);
        assert!(harness.heard(SoundEffect::Jump));
    }

    #[test]
    fn proximity_collects_and_arms_collecting() {
        let mut config = bare_level();
        config.layout.jerry_cans = vec![(5.5, 1.0)];
        let mut harness = Harness::new(config, JourneyLeg::Outbound);
        let report = harness.tick(PlayerInput::default());
        assert_eq!(report.collections.len(), 1);
        assert_eq!(report.collections[0].kind, PickupKind::JerryCan);
        assert_eq!(harness.store.state().water_points, 1);
        assert!(harness.session.character().is_collecting);
        assert_eq!(harness.session.animation_state(), AnimationState::Collecting);

        // never again in the same session
        assert!(harness.tick(PlayerInput::default()).collections.is_empty());
        assert_eq!(harness.store.state().water_points, 1);
    }

    #[test]
    fn hazard_damage_is_a_collision() {
        let mut config = bare_level();
        config.layout.scorpions = vec![crate::hazard::PatrolSpec {
            x: 5.0,
            y: 1.0,
            min: 4.0,
            max: 6.0,
            speed: 0.0,
        }];
        let mut harness = Harness::new(config, JourneyLeg::Outbound);
        let report = harness.tick(PlayerInput::default());
        assert_eq!(report.hits.len(), 1);
        assert_relative_eq!(harness.energy(), 100.0 - 0.5 - 10.0);
        assert!(harness.heard(SoundEffect::Hit));
        assert_eq!(harness.session.animation_state(), AnimationState::Hit);
    }

    #[test]
    fn tap_collects_a_can_once() {
        let mut config = bare_level();
        config.layout.jerry_cans = vec![(8.0, 1.0)];
        let mut harness = Harness::new(config, JourneyLeg::Outbound);
        let can = harness.session.pickups().get(PickupId(0)).unwrap().spawn;

        let collection = harness.tap(can).unwrap();
        assert_eq!(collection.kind, PickupKind::JerryCan);
        assert_eq!(harness.store.state().water_points, 1);
        assert!(harness.session.character().is_collecting);
        assert!(harness.heard(SoundEffect::CollectPickup));

        assert!(harness.tap(can).is_none());
        assert_eq!(harness.store.state().water_points, 1);
    }

    #[test]
    fn tap_misses_empty_sky() {
        let mut config = bare_level();
        config.layout.jerry_cans = vec![(8.0, 1.0)];
        let mut harness = Harness::new(config, JourneyLeg::Outbound);
        assert!(harness.tap(Point3::new(8.0, 6.0, 0.0)).is_none());
        assert_eq!(harness.session.pickups().remaining(), 1);
    }

    #[test]
    fn tap_is_ignored_once_the_leg_is_complete() {
        let mut config = bare_level();
        config.layout.player_start = (198.0, 0.6, 0.0);
        config.layout.jerry_cans = vec![(196.0, 1.0)];
        let mut harness = Harness::new(config, JourneyLeg::Outbound);
        // standing clear of the can, so proximity leaves it alone
        assert!(harness.tick(right()).completed);
        assert_eq!(harness.session.pickups().remaining(), 1);

        assert!(harness.tap(Point3::new(196.0, 1.0, 0.0)).is_none());
        assert_eq!(harness.store.state().water_points, 0);
        assert_eq!(harness.session.pickups().remaining(), 1);
    }

    #[test]
    fn completion_waits_a_second_then_fires_once() {
        let mut config = bare_level();
        config.layout.player_start = (198.0, 0.6, 0.0);
        let mut harness = Harness::new(config, JourneyLeg::Outbound);
        assert!(harness.tick(right()).completed);
        assert_eq!(harness.session.status(), SessionStatus::Complete);
        assert_eq!(harness.calls.complete, 0);

        for _ in 1..60 {
            let report = harness.tick(right());
            assert!(!report.completed && !report.announced);
        }
        assert_eq!(harness.calls.complete, 0);
        assert!(harness.tick(right()).announced);
        assert_eq!(harness.calls.complete, 1);

        for _ in 0..120 {
            assert!(!harness.tick(right()).announced);
        }
        assert_eq!(harness.calls.complete, 1);
        assert_eq!(harness.calls.return_complete, 0);
        assert_eq!(harness.session.status(), SessionStatus::Complete);
        assert_eq!(harness.session.animation_state(), AnimationState::Victorious);
        // no drain once frozen
        let energy = harness.energy();
        harness.tick(right());
        assert_relative_eq!(harness.energy(), energy);
    }

    #[test]
    fn return_leg_completion_plays_day_complete() {
        let mut config = bare_level();
        config.layout.player_start = (196.0, 0.6, 0.0);
        let mut harness = Harness::new(config, JourneyLeg::Return);
        assert!(harness.tick(PlayerInput::default()).completed);
        assert!(!harness.heard(SoundEffect::DayComplete));
        for _ in 0..60 {
            harness.tick(PlayerInput::default());
        }
        assert_eq!(harness.calls.return_complete, 1);
        assert_eq!(harness.calls.complete, 0);
        assert!(harness.heard(SoundEffect::DayComplete));
    }

    #[test]
    fn empty_tank_at_the_finish_is_game_over() {
        let mut config = bare_level();
        config.layout.player_start = (198.0, 0.6, 0.0);
        let mut harness = Harness::new(config, JourneyLeg::Outbound);
        harness
            .store
            .update_energy(-99.6, EnergyOptions::default());
        let report = harness.tick(right());
        assert!(report.game_over);
        assert!(!report.completed);
        assert_eq!(harness.session.status(), SessionStatus::GameOver);
        assert_eq!(harness.session.animation_state(), AnimationState::Dead);

        for _ in 0..90 {
            harness.tick(right());
        }
        assert_eq!(harness.calls.game_over, 1);
        assert_eq!(harness.calls.complete, 0);
    }

    #[test]
    fn state_changes_reach_the_app_once_each() {
        let mut config = bare_level();
        config.layout.jerry_cans = vec![(8.0, 1.0)];
        let mut harness = Harness::new(config, JourneyLeg::Outbound);
        // the opening drain
        harness.tick(PlayerInput::default());
        assert_eq!(harness.calls.states.len(), 1);
        assert_relative_eq!(harness.calls.states[0].energy, 99.5);
        // standing still between drains changes nothing
        harness.tick(PlayerInput::default());
        assert_eq!(harness.calls.states.len(), 1);

        harness.tap(Point3::new(8.0, 1.0, 0.0)).unwrap();
        assert_eq!(harness.calls.states.len(), 2);
        assert_eq!(harness.calls.states[1].water_points, 1);
    }

    #[test]
    fn a_hit_reports_the_lowered_energy() {
        let mut config = bare_level();
        config.layout.scorpions = vec![crate::hazard::PatrolSpec {
            x: 5.0,
            y: 1.0,
            min: 4.0,
            max: 6.0,
            speed: 0.0,
        }];
        let mut harness = Harness::new(config, JourneyLeg::Outbound);
        harness.tick(PlayerInput::default());
        // drain, then the sting
        assert_eq!(harness.calls.states.len(), 2);
        assert_relative_eq!(harness.calls.states[1].energy, 89.5);
    }

    #[test]
    fn full_energy_orb_changes_nothing_to_report() {
        let mut config = bare_level();
        config.layout.energy_orbs = vec![(8.0, 1.5)];
        let mut harness = Harness::new(config, JourneyLeg::Outbound);
        let mut ctx = SessionContext {
            owner: &mut harness.store,
            sound: harness.sounds.as_ref(),
            hooks: &mut harness.calls,
        };
        harness.session.begin(&mut ctx);
        assert_eq!(harness.calls.states.len(), 1);
        harness.tap(Point3::new(8.0, 1.5, 0.0)).unwrap();
        assert_relative_eq!(harness.energy(), 100.0);
        assert_eq!(harness.calls.states.len(), 1);
    }

    #[test]
    fn empty_energy_is_game_over_once() {
        let mut harness = Harness::new(bare_level(), JourneyLeg::Outbound);
        harness
            .store
            .update_energy(-99.8, EnergyOptions::default());
        let report = harness.tick(PlayerInput::default());
        assert!(report.game_over);
        assert_eq!(harness.calls.low_energy, 0);
        harness.tick(PlayerInput::default());
        assert_eq!(harness.calls.game_over, 1);
        assert_eq!(harness.session.status(), SessionStatus::GameOver);
        assert_eq!(harness.session.animation_state(), AnimationState::Dead);
    }

    #[test]
    fn crossing_low_energy_notifies_the_app() {
        let mut harness = Harness::new(bare_level(), JourneyLeg::Outbound);
        harness
            .store
            .update_energy(-89.7, EnergyOptions::default());
        harness.tick(PlayerInput::default());
        assert_eq!(harness.calls.low_energy, 1);
        harness.tick(right());
        assert_eq!(harness.calls.low_energy, 1);
    }

    #[test]
    fn restart_restores_the_level() {
        let mut config = bare_level();
        config.layout.jerry_cans = vec![(5.5, 1.0)];
        let mut harness = Harness::new(config, JourneyLeg::Return);
        for _ in 0..50 {
            harness.tick(right());
        }
        assert_eq!(harness.session.pickups().remaining(), 0);

        let mut ctx = SessionContext {
            owner: &mut harness.store,
            sound: harness.sounds.as_ref(),
            hooks: &mut harness.calls,
        };
        harness.session.restart(&mut ctx).unwrap();
        assert_relative_eq!(harness.energy(), 100.0);
        assert_eq!(harness.store.state().time_of_day, TimeOfDay::Afternoon);
        assert_eq!(harness.session.pickups().remaining(), 1);
        assert_eq!(harness.session.body().position, Point3::new(5.0, 1.0, 0.0));
        assert_eq!(harness.session.status(), SessionStatus::Playing);
        assert_eq!(harness.session.animation_state(), AnimationState::Idle);
    }

    #[test]
    fn recover_moves_a_corrupted_player_back_to_start() {
        let mut harness = Harness::new(bare_level(), JourneyLeg::Outbound);
        harness.session.body.position.x = f32::NAN;
        harness.session.recover().unwrap();
        assert_relative_eq!(harness.session.body().position.x, 5.0);
        assert_eq!(harness.session.animation_state(), AnimationState::Idle);
    }

    #[test]
    fn queued_notices_deliver_in_order() {
        let mut queue: Vec<JourneyNotice> = Vec::new();
        queue.on_low_energy(9.5);
        queue.on_game_over();
        queue.on_state_changed(&GameState::default());
        let mut calls = Calls::default();
        for notice in queue.drain(..) {
            notice.deliver(&mut calls);
        }
        assert_eq!(calls.low_energy, 1);
        assert_eq!(calls.game_over, 1);
        assert_eq!(calls.states, vec![GameState::default()]);
        assert!(queue.is_empty());
    }

    #[test]
    fn legs_parse_from_js_names() {
        assert_eq!(JourneyLeg::parse("outbound"), Some(JourneyLeg::Outbound));
        assert_eq!(JourneyLeg::parse("return"), Some(JourneyLeg::Return));
        assert_eq!(JourneyLeg::parse("sideways"), None);
        assert_eq!(JourneyLeg::Return.time_of_day(), TimeOfDay::Afternoon);
    }
}
