use crate::browser;
use crate::engine::{ms_to_ticks, Point};
use anyhow::{anyhow, Result};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use std::collections::HashSet;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent};

/// Touch controls stay "held" this long after a single tap
const MOBILE_INPUT_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobileAction {
    Left,
    Right,
    Jump,
}

impl MobileAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "left" => Some(MobileAction::Left),
            "right" => Some(MobileAction::Right),
            "jump" => Some(MobileAction::Jump),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    Mobile(MobileAction),
    /// canvas pixel coordinates
    Pointer(Point),
}

/// Everything the player is doing right now
/// - keyboard codes currently held
/// - the last mobile action, alive for a short window of ticks
/// - pointer taps not yet consumed by the game
#[derive(Debug, Default)]
pub struct KeyState {
    pressed: HashSet<String>,
    mobile: Option<(MobileAction, u32)>,
    taps: Vec<Point>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self, code: &str) -> bool {
        self.pressed.contains(code)
    }

    pub fn any_pressed(&self, codes: &[&str]) -> bool {
        codes.iter().any(|code| self.is_pressed(code))
    }

    pub fn set_pressed(&mut self, code: &str) {
        self.pressed.insert(code.to_string());
    }

    pub fn set_released(&mut self, code: &str) {
        self.pressed.remove(code);
    }

    pub fn press_mobile(&mut self, action: MobileAction) {
        self.mobile = Some((action, ms_to_ticks(MOBILE_INPUT_MS)));
    }

    pub fn mobile_action(&self) -> Option<MobileAction> {
        self.mobile.map(|(action, _)| action)
    }

    pub fn push_tap(&mut self, point: Point) {
        self.taps.push(point);
    }

    pub fn take_taps(&mut self) -> Vec<Point> {
        std::mem::take(&mut self.taps)
    }

    /// Called once per simulation tick, expires the mobile window
    pub fn tick(&mut self) {
        self.mobile = match self.mobile {
            Some((action, ticks)) if ticks > 1 => Some((action, ticks - 1)),
            _ => None,
        };
    }

    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyDown(code) => self.set_pressed(&code),
            InputEvent::KeyUp(code) => self.set_released(&code),
            InputEvent::Mobile(action) => self.press_mobile(action),
            InputEvent::Pointer(point) => self.push_tap(point),
        }
    }
}

type Listener = Closure<dyn FnMut(web_sys::Event)>;

/// Owns the DOM callbacks feeding the input channel
/// - dropping the guard detaches every listener
pub struct InputListeners {
    sender: UnboundedSender<InputEvent>,
    attached: Vec<(EventTarget, &'static str, Listener)>,
}

impl InputListeners {
    /// Extra handle for input that does not come from the DOM (touch buttons)
    pub fn sender(&self) -> UnboundedSender<InputEvent> {
        self.sender.clone()
    }

    fn attach(
        &mut self,
        target: EventTarget,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<()> {
        let listener: Listener =
            browser::closure_wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
        target
            .add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("Could not listen for {} : {:#?}", event, err))?;
        self.attached.push((target, event, listener));
        Ok(())
    }
}

impl Drop for InputListeners {
    fn drop(&mut self) {
        for (target, event, listener) in self.attached.drain(..) {
            if let Err(err) =
                target.remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
            {
                error!("Could not remove {} listener : {:#?}", event, err);
            }
        }
    }
}

/// Wire keyboard (document) and pointer (canvas) events into one channel
pub fn prepare_input(
    canvas: &HtmlCanvasElement,
) -> Result<(UnboundedReceiver<InputEvent>, InputListeners)> {
    let (sender, receiver) = unbounded();
    let mut listeners = InputListeners {
        sender: sender.clone(),
        attached: Vec::new(),
    };
    let document: EventTarget = browser::document()?.into();

    let keydown_sender = sender.clone();
    listeners.attach(document.clone(), "keydown", move |event: web_sys::Event| {
        if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
            let _ = keydown_sender.unbounded_send(InputEvent::KeyDown(event.code()));
        }
    })?;

    let keyup_sender = sender.clone();
    listeners.attach(document, "keyup", move |event: web_sys::Event| {
        if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
            let _ = keyup_sender.unbounded_send(InputEvent::KeyUp(event.code()));
        }
    })?;

    let pointer_canvas = canvas.clone();
    listeners.attach(canvas.clone().into(), "pointerdown", move |event: web_sys::Event| {
        event.prevent_default();
        if let Some(event) = event.dyn_ref::<MouseEvent>() {
            // css pixels -> canvas pixels, the canvas may be stretched by its container
            let scale_x = pointer_canvas.width() as f32 / pointer_canvas.client_width().max(1) as f32;
            let scale_y = pointer_canvas.height() as f32 / pointer_canvas.client_height().max(1) as f32;
            let _ = sender.unbounded_send(InputEvent::Pointer(Point {
                x: event.offset_x() as f32 * scale_x,
                y: event.offset_y() as f32 * scale_y,
            }));
        }
    })?;

    Ok((receiver, listeners))
}

/// Drain everything queued since the last frame
pub fn process_input(state: &mut KeyState, receiver: &mut UnboundedReceiver<InputEvent>) {
    while let Ok(Some(event)) = receiver.try_next() {
        state.apply(event);
    }
}
