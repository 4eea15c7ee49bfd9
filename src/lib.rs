// ==================== Imports ====================
use crate::audio::{ConsoleSound, SoundEffect, SoundEffects};
use crate::engine::{GameLoop, InputEvent, LoopControl, MobileAction, Size};
use crate::game::{Journey, JourneyLink};
use crate::game_state::{GameState, GameStore};
use crate::session::{JourneyHooks, JourneyLeg};
use futures::channel::mpsc::UnboundedSender;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsValue};

#[macro_use]
mod browser;
pub mod audio;
pub mod camera;
pub mod engine;
pub mod game;
pub mod game_state;
pub mod hazard;
pub mod level;
pub mod lifecycle;
pub mod physics;
pub mod pickup;
pub mod scene;
pub mod session;
pub mod sprite;

// ==================== Active session ====================
// Exactly one journey runs at a time
// - starting a new one clears the old loop's running flag first
// - the old loop notices on its next frame and disposes itself
thread_local! {
    static ACTIVE_LOOP: RefCell<Option<LoopControl>> = RefCell::new(None);
}

fn stop_active() {
    ACTIVE_LOOP.with(|active| {
        if let Some(previous) = active.borrow_mut().take() {
            log!("Stopping the previous journey");
            previous.stop();
        }
    });
}

fn to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}

// ==================== Page hooks ====================
/// Optional callbacks handed over by the page
/// ```text
/// {
///   state?: { waterPoints, energy, day, timeOfDay },
///   onSound?(name, volume),
///   onJourneyComplete?(), onReturnJourneyComplete?(),
///   onGameOver?(), onLowEnergy?(energy),
///   onStateChange?(state),
/// }
/// ```
struct JsHooks {
    hooks: JsValue,
    fallback_sound: ConsoleSound,
}

impl JsHooks {
    fn new(hooks: JsValue) -> Self {
        JsHooks {
            hooks,
            fallback_sound: ConsoleSound::default(),
        }
    }

    fn field(&self, name: &str) -> Option<JsValue> {
        if !self.hooks.is_object() {
            return None;
        }
        js_sys::Reflect::get(&self.hooks, &JsValue::from_str(name))
            .ok()
            .filter(|value| !value.is_undefined() && !value.is_null())
    }

    /// Call `name` if the page provided it, false when it did not
    fn call(&self, name: &str, args: &[JsValue]) -> bool {
        let Some(function) = self
            .field(name)
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok())
        else {
            return false;
        };
        let result = match args {
            [] => function.call0(&self.hooks),
            [first] => function.call1(&self.hooks, first),
            [first, second, ..] => function.call2(&self.hooks, first, second),
        };
        if let Err(err) = result {
            error!("Hook {} threw : {:#?}", name, err);
        }
        true
    }

    /// The record saved by the page, or a fresh one
    fn saved_state(&self) -> GameState {
        let Some(value) = self.field("state") else {
            return GameState::default();
        };
        serde_wasm_bindgen::from_value(value).unwrap_or_else(|err| {
            error!("Ignoring unreadable saved state : {}", err);
            GameState::default()
        })
    }
}

impl SoundEffects for JsHooks {
    fn play(&self, effect: SoundEffect) {
        let args = [
            JsValue::from_str(effect.name()),
            JsValue::from_f64(effect.volume().into()),
        ];
        if !self.call("onSound", &args) {
            self.fallback_sound.play(effect);
        }
    }
}

impl JourneyHooks for Rc<JsHooks> {
    fn on_journey_complete(&mut self) {
        self.call("onJourneyComplete", &[]);
    }

    fn on_return_journey_complete(&mut self) {
        self.call("onReturnJourneyComplete", &[]);
    }

    fn on_game_over(&mut self) {
        self.call("onGameOver", &[]);
    }

    fn on_low_energy(&mut self, energy: f32) {
        self.call("onLowEnergy", &[JsValue::from_f64(energy.into())]);
    }

    fn on_state_changed(&mut self, state: &GameState) {
        match serde_wasm_bindgen::to_value(state) {
            Ok(value) => {
                self.call("onStateChange", &[value]);
            }
            Err(err) => error!("Could not hand over the state : {}", err),
        }
    }
}

fn reload_page() {
    if let Err(err) = browser::reload() {
        error!("Retry failed : {:#?}", err);
    }
}

// ==================== Main Functions ====================
/// Handle the page keeps for the running journey
#[wasm_bindgen]
pub struct JourneyHandle {
    control: LoopControl,
    input: UnboundedSender<InputEvent>,
    link: Rc<JourneyLink>,
}

#[wasm_bindgen]
impl JourneyHandle {
    /// Touch button press, held for a short window
    /// - "left" | "right" | "jump", anything else is ignored
    pub fn mobile_input(&self, action: &str) -> bool {
        match MobileAction::parse(action) {
            Some(action) => self.input.unbounded_send(InputEvent::Mobile(action)).is_ok(),
            None => false,
        }
    }

    /// `{ waterPoints, energy, day, timeOfDay }` as a plain object
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let state = self.link.snapshot().map_err(to_js)?;
        serde_wasm_bindgen::to_value(&state).map_err(JsValue::from)
    }

    /// Reset the level on the next tick
    pub fn restart(&self) {
        self.link.request_restart();
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }
}

/// Main entry for Webassembly module
/// - stops whatever journey was running
/// - wires input and page hooks
/// - loads the level and starts the frame loop in the background
#[wasm_bindgen]
pub fn start_journey(canvas_id: &str, leg: &str, hooks: JsValue) -> Result<JourneyHandle, JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();

    let leg = JourneyLeg::parse(leg).ok_or_else(|| {
        JsValue::from_str(&format!(
            "Unknown journey leg '{}', expected 'outbound' or 'return'",
            leg
        ))
    })?;
    stop_active();

    let canvas = browser::canvas(canvas_id).map_err(to_js)?;
    let js_hooks = Rc::new(JsHooks::new(hooks));
    let store = GameStore::new(js_hooks.saved_state(), js_hooks.clone());
    let sound: Rc<dyn SoundEffects> = js_hooks.clone();
    let link = JourneyLink::new(Box::new(store), sound, Box::new(js_hooks));

    let (receiver, listeners) = engine::input::prepare_input(&canvas).map_err(to_js)?;
    let input = listeners.sender();
    let control = LoopControl::new();
    ACTIVE_LOOP.with(|active| *active.borrow_mut() = Some(control.clone()));

    let screen = Size {
        width: canvas.width() as f32,
        height: canvas.height() as f32,
    };
    let game = Journey::new(leg, link.clone(), screen);
    let loop_control = control.clone();
    let on_retry: Rc<dyn Fn()> = Rc::new(reload_page);

    // spawns a new asynchronous task in local thread, for web assembly
    // environment, using wasm_bindgen_futures
    browser::spawn_local(async move {
        if let Err(err) = GameLoop::start(
            game,
            canvas.clone(),
            (receiver, listeners),
            loop_control,
            on_retry,
        )
        .await
        {
            error!("Failed to start journey : {:#?}", err);
            if let Err(overlay_err) = browser::show_error_overlay(
                &canvas,
                "Failed to Start Game",
                &format!("{:#}", err),
                reload_page,
            ) {
                error!("Could not show error overlay : {:#?}", overlay_err);
            }
        }
    });

    Ok(JourneyHandle {
        control,
        input,
        link,
    })
}

/// Stop the running journey, if any
#[wasm_bindgen]
pub fn stop_journey() {
    stop_active();
}
