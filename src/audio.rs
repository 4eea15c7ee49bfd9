use std::rc::Rc;

/// Cues the level can ask for, fire and forget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    Jump,
    CollectPickup,
    Hit,
    LowEnergyWarning,
    DayComplete,
}

impl SoundEffect {
    pub fn name(self) -> &'static str {
        match self {
            SoundEffect::Jump => "jump",
            SoundEffect::CollectPickup => "collectPickup",
            SoundEffect::Hit => "hit",
            SoundEffect::LowEnergyWarning => "lowEnergyWarning",
            SoundEffect::DayComplete => "dayComplete",
        }
    }

    /// Mix level relative to the sfx channel
    pub fn volume(self) -> f32 {
        match self {
            SoundEffect::Jump => 0.5,
            SoundEffect::CollectPickup => 0.6,
            SoundEffect::Hit => 0.5,
            SoundEffect::LowEnergyWarning => 0.4,
            SoundEffect::DayComplete => 0.8,
        }
    }
}

pub trait SoundEffects {
    fn play(&self, effect: SoundEffect);
}

impl<T: SoundEffects + ?Sized> SoundEffects for Rc<T> {
    fn play(&self, effect: SoundEffect) {
        (**self).play(effect)
    }
}

/// Stand-in when no audio backend is wired up, cues go to the console
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSound {
    pub muted: bool,
}

impl SoundEffects for ConsoleSound {
    fn play(&self, effect: SoundEffect) {
        if !self.muted {
            log!("sfx {} ({})", effect.name(), effect.volume());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<SoundEffect>>);

    impl SoundEffects for Recorder {
        fn play(&self, effect: SoundEffect) {
            self.0.borrow_mut().push(effect);
        }
    }

    #[test]
    fn shared_handles_reach_the_same_backend() {
        let recorder = Rc::new(Recorder::default());
        let handle: Rc<Recorder> = recorder.clone();
        handle.play(SoundEffect::Jump);
        recorder.play(SoundEffect::Hit);
        assert_eq!(*recorder.0.borrow(), vec![SoundEffect::Jump, SoundEffect::Hit]);
    }

    #[test]
    fn every_cue_has_a_name_and_volume() {
        for effect in [
            SoundEffect::Jump,
            SoundEffect::CollectPickup,
            SoundEffect::Hit,
            SoundEffect::LowEnergyWarning,
            SoundEffect::DayComplete,
        ] {
            assert!(!effect.name().is_empty());
            assert!(effect.volume() > 0.0 && effect.volume() <= 1.0);
        }
    }
}
