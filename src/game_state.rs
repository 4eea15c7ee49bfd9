use crate::audio::{SoundEffect, SoundEffects};
use serde::{Deserialize, Serialize};

pub const MAX_ENERGY: f32 = 100.0;
pub const LOW_ENERGY: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeOfDay {
    #[default]
    Morning,
    Afternoon,
}

/// The flat record the app persists between visits
/// - the level never writes these fields directly, only through the owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameState {
    pub water_points: u32,
    pub energy: f32,
    pub day: u32,
    pub time_of_day: TimeOfDay,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            water_points: 0,
            energy: MAX_ENERGY,
            day: 1,
            time_of_day: TimeOfDay::Morning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnergyOptions {
    /// the loss came from running into a hazard
    pub collision: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyChange {
    pub before: f32,
    pub after: f32,
    /// went from above LOW_ENERGY to at or below it
    pub crossed_low: bool,
}

/// Bounded update operations over the persisted record
pub trait GameStateOwner {
    fn state(&self) -> &GameState;
    /// energy = clamp(energy + delta, 0, 100)
    fn update_energy(&mut self, delta: f32, options: EnergyOptions) -> EnergyChange;
    fn add_water_points(&mut self, points: u32);
    /// Back to full, used by a level restart
    fn refill_energy(&mut self);
    fn set_time_of_day(&mut self, time_of_day: TimeOfDay);
}

/// Default owner, keeps the record and plays the matching cues
pub struct GameStore<S: SoundEffects> {
    state: GameState,
    sound: S,
}

impl<S: SoundEffects> GameStore<S> {
    pub fn new(state: GameState, sound: S) -> Self {
        let mut store = GameStore { state, sound };
        // a hand edited or stale save may hold anything
        store.state.energy = clamp_energy(store.state.energy);
        store
    }
}

fn clamp_energy(energy: f32) -> f32 {
    if energy.is_nan() {
        MAX_ENERGY
    } else {
        energy.clamp(0.0, MAX_ENERGY)
    }
}

impl<S: SoundEffects> GameStateOwner for GameStore<S> {
    fn state(&self) -> &GameState {
        &self.state
    }

    fn update_energy(&mut self, delta: f32, options: EnergyOptions) -> EnergyChange {
        let before = self.state.energy;
        let delta = if delta.is_finite() { delta } else { 0.0 };
        let after = clamp_energy(before + delta);
        self.state.energy = after;

        if delta > 0.0 {
            self.sound.play(SoundEffect::CollectPickup);
        } else if delta < 0.0 && (options.collision || after <= LOW_ENERGY) {
            self.sound.play(SoundEffect::Hit);
        }

        let crossed_low = before > LOW_ENERGY && after <= LOW_ENERGY;
        if crossed_low {
            log!("Low energy! {} left", after);
            self.sound.play(SoundEffect::LowEnergyWarning);
        }
        EnergyChange {
            before,
            after,
            crossed_low,
        }
    }

    fn add_water_points(&mut self, points: u32) {
        self.state.water_points = self.state.water_points.saturating_add(points);
        self.sound.play(SoundEffect::CollectPickup);
    }

    fn refill_energy(&mut self) {
        self.state.energy = MAX_ENERGY;
    }

    fn set_time_of_day(&mut self, time_of_day: TimeOfDay) {
        self.state.time_of_day = time_of_day;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<SoundEffect>>);

    impl SoundEffects for Recorder {
        fn play(&self, effect: SoundEffect) {
            self.0.borrow_mut().push(effect);
        }
    }

    fn store_with(energy: f32) -> (GameStore<Rc<Recorder>>, Rc<Recorder>) {
        let sound = Rc::new(Recorder::default());
        let state = GameState { energy, ..GameState::default() };
        (GameStore::new(state, sound.clone()), sound)
    }

    #[test]
    fn energy_stays_within_bounds() {
        let (mut store, _) = store_with(95.0);
        assert_relative_eq!(store.update_energy(25.0, EnergyOptions::default()).after, 100.0);
        assert_relative_eq!(store.update_energy(-250.0, EnergyOptions::default()).after, 0.0);
        assert_relative_eq!(store.update_energy(f32::NAN, EnergyOptions::default()).after, 0.0);
    }

    #[test]
    fn crossing_low_energy_warns_once() {
        let (mut store, sound) = store_with(11.0);
        let change = store.update_energy(-5.0, EnergyOptions { collision: true });
        assert_relative_eq!(change.after, 6.0);
        assert!(change.crossed_low);
        assert_eq!(
            *sound.0.borrow(),
            vec![SoundEffect::Hit, SoundEffect::LowEnergyWarning]
        );

        let again = store.update_energy(-1.0, EnergyOptions::default());
        assert!(!again.crossed_low);
        let warnings = sound
            .0
            .borrow()
            .iter()
            .filter(|effect| **effect == SoundEffect::LowEnergyWarning)
            .count();
        assert_eq!(warnings, 1);
    }

    #[test]
    fn quiet_drain_makes_no_sound() {
        let (mut store, sound) = store_with(80.0);
        store.update_energy(-0.5, EnergyOptions::default());
        assert!(sound.0.borrow().is_empty());
    }

    #[test]
    fn gains_and_water_play_collect() {
        let (mut store, sound) = store_with(50.0);
        store.update_energy(25.0, EnergyOptions::default());
        store.add_water_points(1);
        assert_eq!(store.state().water_points, 1);
        assert_eq!(
            *sound.0.borrow(),
            vec![SoundEffect::CollectPickup, SoundEffect::CollectPickup]
        );
    }

    #[test]
    fn stale_save_is_clamped() {
        let (store, _) = store_with(180.0);
        assert_relative_eq!(store.state().energy, 100.0);
    }
}
