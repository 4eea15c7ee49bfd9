use crate::camera::CameraConfig;
use crate::engine::Point3;
use crate::hazard::{HazardConfig, PatrolSpec};
use crate::physics::{PhysicsConfig, Platform};
use crate::pickup::PickupConfig;
use crate::sprite::billboard::BillboardConfig;
use crate::sprite::SpriteSheetGrid;
use serde::Deserialize;

/// Tuning plus layout for one journey
/// - every section and field is optional in `journey.json`
/// - anything missing falls back to the shipped level
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct LevelConfig {
    pub physics: PhysicsConfig,
    pub camera: CameraConfig,
    pub energy: EnergyConfig,
    pub pickups: PickupConfig,
    pub hazards: HazardConfig,
    pub sprite_sheet: SpriteSheetGrid,
    pub billboard: BillboardConfig,
    pub layout: LevelLayout,
}

impl LevelConfig {
    pub const PATH: &'static str = "journey.json";

    /// x the player has to reach to finish the leg
    pub fn completion_x(&self) -> f32 {
        self.physics.level_width - self.energy.completion_margin
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnergyConfig {
    /// lost every `drain_interval_ms` no matter what
    pub drain_rate: f32,
    pub drain_interval_ms: u32,
    /// lost on every tick with horizontal input
    pub movement_cost: f32,
    /// distance before the level's right edge that counts as arrival
    pub completion_margin: f32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        EnergyConfig {
            drain_rate: 0.5,
            drain_interval_ms: 1000,
            movement_cost: 0.2,
            completion_margin: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PlatformSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    #[serde(default = "PlatformSpec::default_height")]
    pub height: f32,
}

impl PlatformSpec {
    fn default_height() -> f32 {
        1.0
    }

    pub fn build(&self) -> Platform {
        Platform::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LevelLayout {
    pub player_start: (f32, f32, f32),
    pub platforms: Vec<PlatformSpec>,
    pub jerry_cans: Vec<(f32, f32)>,
    pub energy_orbs: Vec<(f32, f32)>,
    pub scorpions: Vec<PatrolSpec>,
    pub tumbleweeds: Vec<PatrolSpec>,
}

impl LevelLayout {
    pub fn player_start(&self) -> Point3 {
        let (x, y, z) = self.player_start;
        Point3::new(x, y, z)
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.platforms.iter().map(PlatformSpec::build).collect()
    }

    pub fn jerry_cans(&self) -> Vec<Point3> {
        to_points(&self.jerry_cans)
    }

    pub fn energy_orbs(&self) -> Vec<Point3> {
        to_points(&self.energy_orbs)
    }
}

fn to_points(list: &[(f32, f32)]) -> Vec<Point3> {
    list.iter().map(|(x, y)| Point3::new(*x, *y, 0.0)).collect()
}

fn platform(x: f32, y: f32, width: f32) -> PlatformSpec {
    PlatformSpec {
        x,
        y,
        width,
        height: 1.0,
    }
}

fn patrol(x: f32, min: f32, max: f32, speed: f32) -> PatrolSpec {
    PatrolSpec {
        x,
        y: 1.0,
        min,
        max,
        speed,
    }
}

// Desert route, 200 units long
// - platforms climb and dip every 10-15 units
// - a jerry can every 10 units starting at 8, an orb every 10 starting at 12
// - three scorpions and two tumbleweeds guard the flats
impl Default for LevelLayout {
    fn default() -> Self {
        LevelLayout {
            player_start: (5.0, 1.0, 0.0),
            platforms: vec![
                platform(15.0, 2.0, 6.0),
                platform(25.0, 4.0, 4.0),
                platform(35.0, 3.0, 5.0),
                platform(45.0, 5.0, 3.0),
                platform(55.0, 2.0, 7.0),
                platform(70.0, 4.0, 4.0),
                platform(80.0, 3.0, 6.0),
                platform(95.0, 5.0, 5.0),
                platform(110.0, 2.0, 4.0),
                platform(120.0, 4.0, 6.0),
                platform(135.0, 3.0, 5.0),
                platform(150.0, 5.0, 4.0),
                platform(165.0, 2.0, 6.0),
                platform(180.0, 4.0, 5.0),
            ],
            jerry_cans: vec![
                (8.0, 1.0),
                (18.0, 3.0),
                (28.0, 5.0),
                (38.0, 4.0),
                (48.0, 6.0),
                (58.0, 3.0),
                (68.0, 5.0),
                (78.0, 4.0),
                (88.0, 6.0),
                (98.0, 3.0),
                (108.0, 5.0),
                (118.0, 4.0),
                (128.0, 6.0),
                (138.0, 3.0),
                (148.0, 5.0),
                (158.0, 4.0),
                (168.0, 6.0),
                (178.0, 3.0),
            ],
            energy_orbs: vec![
                (12.0, 2.0),
                (22.0, 4.0),
                (32.0, 3.0),
                (42.0, 5.0),
                (52.0, 2.0),
                (62.0, 4.0),
                (72.0, 3.0),
                (82.0, 5.0),
                (92.0, 2.0),
                (102.0, 4.0),
                (112.0, 3.0),
                (122.0, 5.0),
                (132.0, 2.0),
                (142.0, 4.0),
                (152.0, 3.0),
                (162.0, 5.0),
                (172.0, 2.0),
                (182.0, 4.0),
            ],
            scorpions: vec![
                patrol(30.0, 28.0, 32.0, 0.03),
                patrol(90.0, 88.0, 92.0, 0.025),
                patrol(150.0, 148.0, 152.0, 0.02),
            ],
            tumbleweeds: vec![
                patrol(50.0, 48.0, 54.0, 0.04),
                patrol(120.0, 118.0, 124.0, 0.035),
            ],
        }
    }
}
