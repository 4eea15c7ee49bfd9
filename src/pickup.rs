use crate::engine::{ms_to_ticks, Aabb, Point, Point3, Rect};
use serde::Deserialize;
use std::f32::consts::TAU;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PickupConfig {
    pub jerry_can_value: u32,
    pub energy_orb_value: f32,
    pub jerry_can_half_width: f32,
    pub jerry_can_half_height: f32,
    pub energy_orb_half_size: f32,
    /// forgiveness box around the player, bigger than the player itself
    pub proximity_half_size: f32,
    pub float_amplitude: f32,
    pub float_speed: f32,
    pub spin_speed: (f32, f32),
    pub flash_ms: u32,
}

impl Default for PickupConfig {
    fn default() -> Self {
        PickupConfig {
            jerry_can_value: 1,
            energy_orb_value: 25.0,
            jerry_can_half_width: 0.25,
            jerry_can_half_height: 0.375,
            energy_orb_half_size: 0.6,
            proximity_half_size: 1.2,
            float_amplitude: 0.2,
            float_speed: 0.02,
            spin_speed: (0.02, 0.01),
            flash_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PickupId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    JerryCan,
    EnergyOrb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reward {
    WaterPoints(u32),
    Energy(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collection {
    pub id: PickupId,
    pub kind: PickupKind,
    pub reward: Reward,
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub kind: PickupKind,
    pub spawn: Point3,
    /// collision bounds, fixed at spawn even while the orb floats
    pub bounds: Aabb,
    pub collected: bool,
    start_phase: f32,
    phase: f32,
    pub rotation: (f32, f32),
    flash_ticks: u32,
}

impl Pickup {
    fn new(kind: PickupKind, spawn: Point3, phase: f32, config: &PickupConfig) -> Self {
        let bounds = match kind {
            PickupKind::JerryCan => Aabb::around(
                spawn.x,
                spawn.y,
                config.jerry_can_half_width,
                config.jerry_can_half_height,
            ),
            PickupKind::EnergyOrb => Aabb::around(
                spawn.x,
                spawn.y,
                config.energy_orb_half_size,
                config.energy_orb_half_size,
            ),
        };
        Pickup {
            kind,
            spawn,
            bounds,
            collected: false,
            start_phase: phase,
            phase,
            rotation: (0.0, 0.0),
            flash_ticks: 0,
        }
    }

    fn float_offset(&self, config: &PickupConfig) -> f32 {
        match self.kind {
            PickupKind::EnergyOrb => self.phase.sin() * config.float_amplitude,
            PickupKind::JerryCan => 0.0,
        }
    }

    /// Where it is drawn this tick
    pub fn position(&self, config: &PickupConfig) -> Point3 {
        self.spawn.offset(Point3::new(0.0, self.float_offset(config), 0.0))
    }

    /// Drawn bounds, what a tap has to land on
    pub fn visual_bounds(&self, config: &PickupConfig) -> Aabb {
        let offset = self.float_offset(config);
        Aabb {
            min_y: self.bounds.min_y + offset,
            max_y: self.bounds.max_y + offset,
            ..self.bounds
        }
    }

    pub fn is_flashing(&self) -> bool {
        self.flash_ticks > 0
    }

    pub fn is_visible(&self) -> bool {
        !self.collected || self.is_flashing()
    }

    fn reset(&mut self) {
        self.collected = false;
        self.phase = self.start_phase;
        self.rotation = (0.0, 0.0);
        self.flash_ticks = 0;
    }
}

/// Every collectible of the level, addressed by `PickupId`
pub struct Pickups {
    config: PickupConfig,
    items: Vec<Pickup>,
}

impl Pickups {
    /// Jerry cans first, then orbs, ids are stable for the session
    /// - `phase` seeds each orb's float cycle
    pub fn new(
        config: PickupConfig,
        jerry_cans: &[Point3],
        energy_orbs: &[Point3],
        mut phase: impl FnMut() -> f32,
    ) -> Self {
        let mut items = Vec::with_capacity(jerry_cans.len() + energy_orbs.len());
        items.extend(
            jerry_cans
                .iter()
                .map(|spawn| Pickup::new(PickupKind::JerryCan, *spawn, 0.0, &config)),
        );
        items.extend(
            energy_orbs
                .iter()
                .map(|spawn| Pickup::new(PickupKind::EnergyOrb, *spawn, phase(), &config)),
        );
        Pickups { config, items }
    }

    pub fn config(&self) -> &PickupConfig {
        &self.config
    }

    pub fn get(&self, id: PickupId) -> Option<&Pickup> {
        self.items.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PickupId, &Pickup)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, pickup)| (PickupId(index), pickup))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.items.iter().filter(|pickup| !pickup.collected).count()
    }

    /// Flip `collected` and report the reward
    /// - None for unknown ids and for anything already collected
    pub fn collect(&mut self, id: PickupId) -> Option<Collection> {
        let flash_ticks = ms_to_ticks(self.config.flash_ms);
        let pickup = self.items.get_mut(id.0)?;
        if pickup.collected {
            return None;
        }
        pickup.collected = true;
        pickup.flash_ticks = flash_ticks;
        let reward = match pickup.kind {
            PickupKind::JerryCan => Reward::WaterPoints(self.config.jerry_can_value),
            PickupKind::EnergyOrb => Reward::Energy(self.config.energy_orb_value),
        };
        Some(Collection {
            id,
            kind: pickup.kind,
            reward,
        })
    }

    /// Collect everything the player's forgiveness box touches
    /// - orbs are checked before jerry cans
    pub fn collect_near(&mut self, player: Point3) -> Vec<Collection> {
        let reach = Aabb::around(
            player.x,
            player.y,
            self.config.proximity_half_size,
            self.config.proximity_half_size,
        );
        let mut in_reach: Vec<(bool, PickupId)> = self
            .iter()
            .filter(|(_, pickup)| !pickup.collected && reach.intersects(&pickup.bounds))
            .map(|(id, pickup)| (pickup.kind == PickupKind::JerryCan, id))
            .collect();
        // stable sort, false (orb) before true (can)
        in_reach.sort_by_key(|(is_can, _)| *is_can);
        in_reach
            .into_iter()
            .filter_map(|(_, id)| self.collect(id))
            .collect()
    }

    /// First visible, uncollected pickup under a screen point
    /// - `project` maps world bounds to the on-screen rectangle
    pub fn pick(&self, point: Point, project: impl Fn(&Aabb, f32) -> Rect) -> Option<PickupId> {
        self.iter()
            .filter(|(_, pickup)| !pickup.collected)
            .find(|(_, pickup)| {
                project(&pickup.visual_bounds(&self.config), pickup.spawn.z).contains(point)
            })
            .map(|(id, _)| id)
    }

    /// Cosmetic motion and flash countdowns, once per tick
    pub fn animate(&mut self) {
        let config = &self.config;
        for pickup in self.items.iter_mut() {
            pickup.flash_ticks = pickup.flash_ticks.saturating_sub(1);
            if pickup.kind == PickupKind::EnergyOrb && !pickup.collected {
                pickup.phase += config.float_speed;
                pickup.rotation.0 += config.spin_speed.0;
                pickup.rotation.1 += config.spin_speed.1;
            }
        }
    }

    /// Restore every pickup, only an explicit level reset does this
    pub fn reset(&mut self) {
        self.items.iter_mut().for_each(Pickup::reset);
    }
}

/// Random start angle for an orb's float cycle, 0 if no entropy is available
pub fn random_phase() -> f32 {
    let mut bytes = [0u8; 4];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => u32::from_le_bytes(bytes) as f32 / u32::MAX as f32 * TAU,
        Err(_) => 0.0,
    }
}
