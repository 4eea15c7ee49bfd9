use crate::engine::{Aabb, Point, Point3};
use serde::Deserialize;

// ==================== Physics ====================
// ELI5: one tick of a box falling and sliding through a world of boxes
// - horizontal speed is SET from input, never accelerated
// - gravity always pulls, the ground plane and platform tops push back
// - platforms resolve one at a time in list order, no second pass
//   - standing where two platforms meet can jitter, that's accepted
//
// TABLE:
// ┌────┬──────────────────────────────┬───────────────────────────────────┐
// │ #  │ step                         │ writes                            │
// ├────┼──────────────────────────────┼───────────────────────────────────┤
// │ 1  │ vx = axis * moveSpeed        │ velocity.x, position.x, facing    │
// │ 2  │ jump if grounded             │ velocity.y, on_ground             │
// │ 3  │ vy -= gravity                │ velocity.y, position.y            │
// │ 4  │ ground plane clamp           │ position.y, velocity.y, on_ground │
// │ 5  │ platform pushout             │ position, velocity.y, on_ground   │
// │ 6  │ level bounds                 │ position.x                        │
// └────┴──────────────────────────────┴───────────────────────────────────┘

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub jump_strength: f32,
    pub move_speed: f32,
    /// sprint multiplies move_speed
    pub run_multiplier: f32,
    pub ground_offset: f32,
    pub player_half_width: f32,
    pub player_half_height: f32,
    pub level_width: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            gravity: 0.015,
            jump_strength: 0.4,
            move_speed: 0.1,
            run_multiplier: 2.0,
            ground_offset: 0.6,
            player_half_width: 0.4,
            player_half_height: 0.6,
            level_width: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Platform {
    pub bounds: Aabb,
}

impl Platform {
    /// `x` is the horizontal center, `y` the underside
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Platform {
            bounds: Aabb {
                min_x: x - width / 2.0,
                max_x: x + width / 2.0,
                min_y: y,
                max_y: y + height,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerInput {
    /// -1 left, 0 none, 1 right
    pub axis: f32,
    pub jump: bool,
    pub sprint: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Point3,
    pub velocity: Point,
    pub on_ground: bool,
    pub facing: Facing,
}

impl Body {
    pub fn new(position: Point3) -> Self {
        Body {
            position,
            velocity: Point::default(),
            on_ground: false,
            facing: Facing::Right,
        }
    }

    pub fn bounds(&self, config: &PhysicsConfig) -> Aabb {
        Aabb::around(
            self.position.x,
            self.position.y,
            config.player_half_width,
            config.player_half_height,
        )
    }

    pub fn speed(&self) -> f32 {
        self.velocity.x.abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    pub jumped: bool,
    /// airborne at the start of the tick, grounded at the end
    pub landed: bool,
}

pub struct Physics {
    config: PhysicsConfig,
    platforms: Vec<Platform>,
}

impl Physics {
    pub fn new(config: PhysicsConfig, platforms: Vec<Platform>) -> Self {
        Physics { config, platforms }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn platform(&self, id: PlatformId) -> Option<&Platform> {
        self.platforms.get(id.0)
    }

    pub fn platforms(&self) -> impl Iterator<Item = (PlatformId, &Platform)> {
        self.platforms
            .iter()
            .enumerate()
            .map(|(index, platform)| (PlatformId(index), platform))
    }

    pub fn step(&self, body: &mut Body, input: PlayerInput) -> StepOutcome {
        let config = &self.config;
        let was_on_ground = body.on_ground;
        let mut outcome = StepOutcome::default();

        // NaN or out of range input is treated as the nearest valid value
        let axis = if input.axis.is_finite() {
            input.axis.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let speed = if input.sprint {
            config.move_speed * config.run_multiplier
        } else {
            config.move_speed
        };
        body.velocity.x = axis * speed;
        body.position.x += body.velocity.x;
        if axis < 0.0 {
            body.facing = Facing::Left;
        } else if axis > 0.0 {
            body.facing = Facing::Right;
        }

        if input.jump && body.on_ground {
            body.velocity.y = config.jump_strength;
            body.on_ground = false;
            outcome.jumped = true;
        }

        body.velocity.y -= config.gravity;
        body.position.y += body.velocity.y;

        if body.position.y <= config.ground_offset {
            body.position.y = config.ground_offset;
            body.velocity.y = 0.0;
            body.on_ground = true;
        } else {
            body.on_ground = false;
        }

        for platform in &self.platforms {
            self.resolve(body, &platform.bounds);
        }

        body.position.x = body.position.x.clamp(0.0, config.level_width);

        outcome.landed = !was_on_ground && body.on_ground;
        outcome
    }

    /// Push the body out of one platform along the axis of least overlap
    fn resolve(&self, body: &mut Body, platform: &Aabb) {
        let config = &self.config;
        let player = body.bounds(config);
        if !player.intersects(platform) {
            return;
        }

        if player.overlap_x(platform) < player.overlap_y(platform) {
            body.position.x = if body.position.x < platform.min_x {
                platform.min_x - config.player_half_width
            } else {
                platform.max_x + config.player_half_width
            };
        } else if body.position.y < platform.min_y {
            // head bump, only upward motion is cancelled
            body.position.y = platform.min_y - config.player_half_height;
            body.velocity.y = body.velocity.y.min(0.0);
        } else {
            body.position.y = platform.max_y + config.player_half_height;
            body.velocity.y = 0.0;
            body.on_ground = true;
        }
    }
}
