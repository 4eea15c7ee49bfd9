use crate::engine::Point3;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HazardConfig {
    /// half size of the contact test around a hazard's center
    pub hit_box: f32,
    pub scorpion_damage: f32,
    pub tumbleweed_damage: f32,
    pub cooldown_ticks: u32,
    /// radians per tick, signed by direction
    pub tumbleweed_spin: f32,
}

impl Default for HazardConfig {
    fn default() -> Self {
        HazardConfig {
            hit_box: 0.7,
            scorpion_damage: 10.0,
            tumbleweed_damage: 5.0,
            cooldown_ticks: 60,
            tumbleweed_spin: 0.08,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PatrolSpec {
    pub x: f32,
    pub y: f32,
    pub min: f32,
    pub max: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HazardId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardKind {
    /// walking enemy
    Scorpion,
    /// rolling hazard
    Tumbleweed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Patroller {
    pub kind: HazardKind,
    pub position: Point3,
    pub patrol_min: f32,
    pub patrol_max: f32,
    pub speed: f32,
    /// -1 or 1
    pub direction: f32,
    pub cooldown: u32,
    pub spin: f32,
    spawn: Point3,
}

impl Patroller {
    pub fn new(kind: HazardKind, spec: &PatrolSpec) -> Self {
        let (patrol_min, patrol_max) = if spec.min <= spec.max {
            (spec.min, spec.max)
        } else {
            (spec.max, spec.min)
        };
        let spawn = Point3::new(spec.x.clamp(patrol_min, patrol_max), spec.y, 0.0);
        Patroller {
            kind,
            position: spawn,
            patrol_min,
            patrol_max,
            speed: spec.speed.abs(),
            direction: 1.0,
            cooldown: 0,
            spin: 0.0,
            spawn,
        }
    }

    /// Turn around first if this tick's step would leave the range,
    /// then move and clamp
    fn patrol(&mut self, spin_rate: f32) {
        let next = self.position.x + self.speed * self.direction;
        if next > self.patrol_max || next < self.patrol_min {
            self.direction = -self.direction;
        }
        self.position.x =
            (self.position.x + self.speed * self.direction).clamp(self.patrol_min, self.patrol_max);
        if self.kind == HazardKind::Tumbleweed {
            self.spin += spin_rate * self.direction;
        }
    }

    fn touches(&self, player: Point3, hit_box: f32) -> bool {
        (self.position.x - player.x).abs() < hit_box && (self.position.y - player.y).abs() < hit_box
    }

    fn reset(&mut self) {
        self.position = self.spawn;
        self.direction = 1.0;
        self.cooldown = 0;
        self.spin = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardHit {
    pub id: HazardId,
    pub kind: HazardKind,
    pub damage: f32,
}

pub struct Hazards {
    config: HazardConfig,
    items: Vec<Patroller>,
}

impl Hazards {
    pub fn new(config: HazardConfig, scorpions: &[PatrolSpec], tumbleweeds: &[PatrolSpec]) -> Self {
        let items = scorpions
            .iter()
            .map(|spec| Patroller::new(HazardKind::Scorpion, spec))
            .chain(
                tumbleweeds
                    .iter()
                    .map(|spec| Patroller::new(HazardKind::Tumbleweed, spec)),
            )
            .collect();
        Hazards { config, items }
    }

    pub fn get(&self, id: HazardId) -> Option<&Patroller> {
        self.items.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HazardId, &Patroller)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, hazard)| (HazardId(index), hazard))
    }

    /// Patrol every hazard, then test contact
    /// - a hazard cooling down keeps moving but cannot hurt
    /// - each hazard is independent, two can land hits on the same tick
    pub fn update(&mut self, player: Point3) -> Vec<HazardHit> {
        let config = &self.config;
        let mut hits = Vec::new();
        for (index, hazard) in self.items.iter_mut().enumerate() {
            hazard.patrol(config.tumbleweed_spin);
            if hazard.cooldown > 0 {
                hazard.cooldown -= 1;
                continue;
            }
            if hazard.touches(player, config.hit_box) {
                hazard.cooldown = config.cooldown_ticks;
                hits.push(HazardHit {
                    id: HazardId(index),
                    kind: hazard.kind,
                    damage: match hazard.kind {
                        HazardKind::Scorpion => config.scorpion_damage,
                        HazardKind::Tumbleweed => config.tumbleweed_damage,
                    },
                });
            }
        }
        hits
    }

    pub fn reset(&mut self) {
        self.items.iter_mut().for_each(Patroller::reset);
    }
}
