/// Which pose the character shows is decided fresh every tick from a
/// snapshot of the level, never by toggling flags incrementally :
/// - `CharacterState` : flags and countdowns the level raises
/// - `select()`       : pure priority rule, snapshot -> one AnimationState
/// - `CharacterAnimator` : restarts a clip ONLY when the state changes
use crate::engine::{ms_to_ticks, FRAME_SIZE};
use crate::physics::Facing;
use crate::sprite::{ClipName, ClipRegistry, SpritePlayer};
use anyhow::Result;

const HIT_MS: u32 = 300;
const COLLECT_MS: u32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharacterState {
    pub is_moving: bool,
    pub is_running: bool,
    pub is_jumping: bool,
    pub is_hit: bool,
    pub hit_ticks: u32,
    pub is_collecting: bool,
    pub collect_ticks: u32,
    pub is_dead: bool,
    pub is_victorious: bool,
    pub facing: Facing,
    // one tick edges, cleared by `reset_edges`
    pub just_landed: bool,
    pub just_started_moving: bool,
    pub just_stopped_moving: bool,
}

impl CharacterState {
    pub fn arm_hit(&mut self) {
        self.is_hit = true;
        self.hit_ticks = ms_to_ticks(HIT_MS);
    }

    pub fn arm_collect(&mut self) {
        self.is_collecting = true;
        self.collect_ticks = ms_to_ticks(COLLECT_MS);
    }

    /// Record this tick's motion and raise the matching edges
    pub fn observe_motion(&mut self, moving: bool, running: bool, jumped: bool, landed: bool) {
        self.just_started_moving = !self.is_moving && moving;
        self.just_stopped_moving = self.is_moving && !moving;
        self.is_moving = moving;
        self.is_running = running;
        self.is_jumping = jumped;
        self.just_landed = landed;
    }

    /// Count the hit/collect windows down, clearing each flag at zero
    pub fn tick_timers(&mut self) {
        if self.is_hit {
            self.hit_ticks = self.hit_ticks.saturating_sub(1);
            self.is_hit = self.hit_ticks > 0;
        }
        if self.is_collecting {
            self.collect_ticks = self.collect_ticks.saturating_sub(1);
            self.is_collecting = self.collect_ticks > 0;
        }
    }

    pub fn reset_edges(&mut self) {
        self.just_landed = false;
        self.just_started_moving = false;
        self.just_stopped_moving = false;
        self.is_jumping = false;
    }
}

/// Everything `select` looks at, copied out of the session each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSnapshot {
    pub is_dead: bool,
    pub is_victorious: bool,
    pub is_hit: bool,
    pub is_collecting: bool,
    pub on_ground: bool,
    pub vertical_velocity: f32,
    pub speed: f32,
    pub run_threshold: f32,
    pub moving_threshold: f32,
}

// ELI5:
// ┌──────────────── Priority, first match wins ──────────────┐
// │  dead        →  energy ran out                           │
// │  victorious  →  reached the end of the level             │
// │  hit         →  hit window still open                    │
// │  collecting  →  collect window still open                │
// │  jumping     →  airborne, rising                         │
// │  falling     →  airborne, not rising                     │
// │  running     →  faster than the run threshold            │
// │  walking     →  faster than the moving threshold         │
// │  idle        →  everything else                          │
// └──────────────────────────────────────────────────────────┘
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Walking,
    Running,
    Jumping,
    Falling,
    Hit,
    Collecting,
    Victorious,
    Dead,
}

impl AnimationState {
    pub fn clip(self) -> ClipName {
        match self {
            AnimationState::Idle => ClipName::Idle,
            AnimationState::Walking => ClipName::Walk,
            AnimationState::Running => ClipName::Run,
            AnimationState::Jumping => ClipName::Jump,
            AnimationState::Falling => ClipName::Fall,
            AnimationState::Hit => ClipName::Hit,
            AnimationState::Collecting => ClipName::Collect,
            AnimationState::Victorious => ClipName::Victory,
            AnimationState::Dead => ClipName::Death,
        }
    }
}

pub fn select(snapshot: &AnimationSnapshot) -> AnimationState {
    if snapshot.is_dead {
        AnimationState::Dead
    } else if snapshot.is_victorious {
        AnimationState::Victorious
    } else if snapshot.is_hit {
        AnimationState::Hit
    } else if snapshot.is_collecting {
        AnimationState::Collecting
    } else if !snapshot.on_ground && snapshot.vertical_velocity > 0.0 {
        AnimationState::Jumping
    } else if !snapshot.on_ground {
        AnimationState::Falling
    } else if snapshot.speed > snapshot.run_threshold {
        AnimationState::Running
    } else if snapshot.speed > snapshot.moving_threshold {
        AnimationState::Walking
    } else {
        AnimationState::Idle
    }
}

pub struct CharacterAnimator {
    registry: &'static ClipRegistry,
    state: AnimationState,
    player: SpritePlayer,
}

impl CharacterAnimator {
    pub fn new(registry: &'static ClipRegistry) -> Result<Self> {
        let state = AnimationState::Idle;
        Ok(CharacterAnimator {
            registry,
            state,
            player: SpritePlayer::new(registry.get(state.clip())?),
        })
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    /// Sheet frame to show this tick
    pub fn frame(&self) -> usize {
        self.player.frame()
    }

    /// Pick the state, switch clips on change, then move the playhead one tick
    /// - returns true when the state changed
    pub fn update(&mut self, snapshot: &AnimationSnapshot) -> Result<bool> {
        let next = select(snapshot);
        let changed = next != self.state;
        if changed {
            log!("Animation change: {:?} -> {:?}", self.state, next);
            self.player.play(self.registry.get(next.clip())?);
            self.state = next;
        }
        self.player.advance(FRAME_SIZE);
        Ok(changed)
    }

    /// Back to the first idle frame
    pub fn reset(&mut self) -> Result<()> {
        self.state = AnimationState::Idle;
        self.player.play(self.registry.get(ClipName::Idle)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::JOURNEY_CLIPS;

    fn standing() -> AnimationSnapshot {
        AnimationSnapshot {
            is_dead: false,
            is_victorious: false,
            is_hit: false,
            is_collecting: false,
            on_ground: true,
            vertical_velocity: 0.0,
            speed: 0.0,
            run_threshold: 0.12,
            moving_threshold: 0.01,
        }
    }

    #[test]
    fn priority_order_is_respected() {
        let everything = AnimationSnapshot {
            is_dead: true,
            is_victorious: true,
            is_hit: true,
            is_collecting: true,
            on_ground: false,
            vertical_velocity: 0.3,
            speed: 0.2,
            ..standing()
        };
        assert_eq!(select(&everything), AnimationState::Dead);
        let alive = AnimationSnapshot { is_dead: false, ..everything };
        assert_eq!(select(&alive), AnimationState::Victorious);
        let playing = AnimationSnapshot { is_victorious: false, ..alive };
        assert_eq!(select(&playing), AnimationState::Hit);
        let unhurt = AnimationSnapshot { is_hit: false, ..playing };
        assert_eq!(select(&unhurt), AnimationState::Collecting);
        let airborne = AnimationSnapshot { is_collecting: false, ..unhurt };
        assert_eq!(select(&airborne), AnimationState::Jumping);
        let dropping = AnimationSnapshot { vertical_velocity: -0.1, ..airborne };
        assert_eq!(select(&dropping), AnimationState::Falling);
        let sprinting = AnimationSnapshot { on_ground: true, ..dropping };
        assert_eq!(select(&sprinting), AnimationState::Running);
        let walking = AnimationSnapshot { speed: 0.1, ..sprinting };
        assert_eq!(select(&walking), AnimationState::Walking);
        let still = AnimationSnapshot { speed: 0.0, ..walking };
        assert_eq!(select(&still), AnimationState::Idle);
    }

    #[test]
    fn select_is_deterministic() {
        let snapshot = AnimationSnapshot { speed: 0.1, ..standing() };
        let first = select(&snapshot);
        assert!((0..100).all(|_| select(&snapshot) == first));
    }

    #[test]
    fn hit_window_expires_on_its_own() {
        let mut state = CharacterState::default();
        state.arm_hit();
        for _ in 0..ms_to_ticks(HIT_MS) - 1 {
            state.tick_timers();
            assert!(state.is_hit);
        }
        state.tick_timers();
        assert!(!state.is_hit);
    }

    #[test]
    fn collect_window_lasts_400ms() {
        let mut state = CharacterState::default();
        state.arm_collect();
        assert_eq!(state.collect_ticks, 24);
        (0..24).for_each(|_| state.tick_timers());
        assert!(!state.is_collecting);
    }

    #[test]
    fn motion_edges_last_one_tick() {
        let mut state = CharacterState::default();
        state.observe_motion(true, false, false, false);
        assert!(state.just_started_moving);
        state.reset_edges();
        assert!(!state.just_started_moving);

        state.observe_motion(true, false, false, false);
        assert!(!state.just_started_moving);
        state.observe_motion(false, false, false, true);
        assert!(state.just_stopped_moving);
        assert!(state.just_landed);
    }

    #[test]
    fn animator_restarts_clip_only_on_change() {
        let mut animator = CharacterAnimator::new(&JOURNEY_CLIPS).unwrap();
        let walking = AnimationSnapshot { speed: 0.1, ..standing() };
        assert!(animator.update(&walking).unwrap());
        assert_eq!(animator.state(), AnimationState::Walking);
        assert_eq!(animator.frame(), 1);

        for _ in 0..20 {
            assert!(!animator.update(&walking).unwrap());
        }
        // still walking, the clip kept going instead of restarting
        assert_ne!(animator.frame(), 1);

        assert!(animator.update(&standing()).unwrap());
        assert_eq!(animator.frame(), 0);
    }

    #[test]
    fn animator_reset_goes_idle() {
        let mut animator = CharacterAnimator::new(&JOURNEY_CLIPS).unwrap();
        animator
            .update(&AnimationSnapshot { is_dead: true, ..standing() })
            .unwrap();
        assert_eq!(animator.state(), AnimationState::Dead);
        animator.reset().unwrap();
        assert_eq!(animator.state(), AnimationState::Idle);
        assert_eq!(animator.frame(), 0);
    }
}
