use crate::browser;
use crate::lifecycle::{FaultAction, Lifecycle, Phase, SessionError};
use anyhow::{anyhow, Error, Result};
// ELI5: web assembly is a single threaded environment, so Rc RefCell > Mutex
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use futures::channel::oneshot::channel;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref (unsafe) cast from Javascript type to Rust type
    // - because we control the closure creation and specify the expected type,
    // in principle this should be generally safe (unsafe) code
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

pub mod input;

pub use input::{InputEvent, InputListeners, KeyState, MobileAction};

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    fn update(&mut self, keystate: &mut KeyState) -> Result<()>;
    fn draw(&mut self, renderer: &Renderer) -> Result<()>;
    /// Rebuild whatever a failed tick may have left half-updated
    fn recover(&mut self) -> Result<()>;
    /// Release textures, canvases and listeners, synchronously
    fn dispose(&mut self);
}

// ==================== Timing ====================
pub const TICKS_PER_SECOND: u32 = 60;
// length of a frame in milliseconds
pub const FRAME_SIZE: f32 = 1.0 / TICKS_PER_SECOND as f32 * 1000.0;

/// Durations in the game are authored in milliseconds and counted in ticks
pub const fn ms_to_ticks(ms: u32) -> u32 {
    (ms * TICKS_PER_SECOND + 999) / 1000
}

/// Decides which display refreshes also advance the simulation
/// - skip 1 : every frame ticks
/// - skip 2 : every other frame ticks, every frame still renders
#[derive(Debug, Clone, Copy)]
pub struct FrameScheduler {
    skip: u32,
    frame_count: u64,
}

impl FrameScheduler {
    pub fn new(skip: u32) -> Self {
        FrameScheduler {
            skip: skip.max(1),
            frame_count: 0,
        }
    }

    /// Low power devices get half the physics rate
    pub fn for_device(is_mobile: bool) -> Self {
        Self::new(if is_mobile { 2 } else { 1 })
    }

    pub fn next_frame(&mut self) -> bool {
        self.frame_count += 1;
        self.frame_count % self.skip as u64 == 0
    }
}

// ==================== Loop control ====================
/// Shared "is running" flag for one game loop
/// - cleared by `stop()`, the loop notices on its next frame and tears down
#[derive(Debug, Clone)]
pub struct LoopControl {
    running: Rc<Cell<bool>>,
}

impl LoopControl {
    pub fn new() -> Self {
        LoopControl {
            running: Rc::new(Cell::new(true)),
        }
    }

    pub fn stop(&self) {
        self.running.set(false);
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }
}

impl Default for LoopControl {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GameLoop {
    scheduler: FrameScheduler,
    lifecycle: Lifecycle,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    /// Initialize the game, then hand it to a self rescheduling
    /// requestAnimationFrame callback
    /// - `input` comes from `input::prepare_input`, the loop owns the listeners
    /// - `on_retry` is wired to the error overlay once recovery gives up
    pub async fn start(
        game: impl Game + 'static,
        canvas: HtmlCanvasElement,
        input: (UnboundedReceiver<InputEvent>, InputListeners),
        control: LoopControl,
        on_retry: Rc<dyn Fn()>,
    ) -> Result<()> {
        let mut game_loop = GameLoop {
            scheduler: FrameScheduler::for_device(browser::is_mobile_user_agent()),
            lifecycle: Lifecycle::new(),
        };
        let (mut events, listeners) = input;
        let mut game = match game.initialize().await {
            Ok(game) => game,
            Err(err) => {
                game_loop.lifecycle.dispose();
                return Err(err);
            }
        };
        game_loop.lifecycle.start_running();

        let renderer = Renderer::new(browser::context(&canvas)?, canvas.clone());
        let mut keystate = KeyState::new();
        let mut listeners = Some(listeners);

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |_perf: f64| {
            if !control.is_running() || game_loop.lifecycle.phase() == Phase::Disposed {
                game.dispose();
                // dropping the guard removes every DOM listener
                listeners.take();
                game_loop.lifecycle.dispose();
                // the closure cannot drop itself while it runs
                let f = f.clone();
                browser::spawn_local(async move {
                    f.borrow_mut().take();
                });
                return;
            }

            input::process_input(&mut keystate, &mut events);
            let should_tick = game_loop.scheduler.next_frame();
            match game_loop.lifecycle.phase() {
                Phase::Running if should_tick => {
                    if let Err(err) = game.update(&mut keystate) {
                        game_loop.handle_fault(err, &canvas, &control, &on_retry);
                    }
                }
                Phase::Faulted if should_tick => {
                    if game_loop.lifecycle.tick_recovery() {
                        log!("Attempting to recover from animation error...");
                        match game.recover() {
                            Ok(()) => game_loop.lifecycle.recovered(),
                            Err(err) => {
                                game_loop.handle_fault(err, &canvas, &control, &on_retry)
                            }
                        }
                    }
                }
                _ => {}
            }

            if game_loop.lifecycle.phase() == Phase::Running {
                if let Err(err) = game.draw(&renderer) {
                    game_loop.handle_fault(err, &canvas, &control, &on_retry);
                }
            }

            if let Some(callback) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(callback) {
                    error!("GameLoop: could not schedule next frame : {:#?}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }

    fn handle_fault(
        &mut self,
        err: Error,
        canvas: &HtmlCanvasElement,
        control: &LoopControl,
        on_retry: &Rc<dyn Fn()>,
    ) {
        error!("Animation error: {:#?}", err);
        match self.lifecycle.fault(&err) {
            FaultAction::RetryAfter(ticks) => {
                log!("Session faulted, retrying in {} ticks", ticks);
            }
            FaultAction::GiveUp => {
                control.stop();
                let on_retry = on_retry.clone();
                if let Err(overlay_err) = browser::show_error_overlay(
                    canvas,
                    "Something went wrong",
                    &format!("{}", err),
                    move || on_retry(),
                ) {
                    error!("Could not show error overlay : {:#?}", overlay_err);
                }
            }
        }
    }
}

// ==================== Geometry ====================
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Point3 { x, y, z }
    }

    pub fn offset(self, by: Point3) -> Self {
        Point3 {
            x: self.x + by.x,
            y: self.y + by.y,
            z: self.z + by.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Screen space rectangle, origin top left
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub fn new_from_x_y(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect::new(Point { x, y }, Size { width, height })
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.size.width
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.size.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x() && point.x <= self.right() && point.y >= self.y() && point.y <= self.bottom()
    }
}

/// World space axis aligned box, y grows upward
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn around(center_x: f32, center_y: f32, half_width: f32, half_height: f32) -> Self {
        Aabb {
            min_x: center_x - half_width,
            max_x: center_x + half_width,
            min_y: center_y - half_height,
            max_y: center_y + half_height,
        }
    }

    /// Strict overlap, touching edges do not count
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.max_x > other.min_x
            && self.min_x < other.max_x
            && self.max_y > other.min_y
            && self.min_y < other.max_y
    }

    pub fn overlap_x(&self, other: &Aabb) -> f32 {
        (self.max_x - other.min_x).min(other.max_x - self.min_x)
    }

    pub fn overlap_y(&self, other: &Aabb) -> f32 {
        (self.max_y - other.min_y).min(other.max_y - self.min_y)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

// ==================== Rendering ====================
/// Anything that can be drawn as a background plane
pub enum Backdrop {
    Image(HtmlImageElement),
    /// procedural stand-in for an image that failed to load
    Generated(HtmlCanvasElement),
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
    canvas: HtmlCanvasElement,
}

impl Renderer {
    pub fn new(context: CanvasRenderingContext2d, canvas: HtmlCanvasElement) -> Self {
        Renderer { context, canvas }
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.canvas.width() as f32,
            height: self.canvas.height() as f32,
        }
    }

    pub fn clear(&self, rect: &Rect) {
        self.context.clear_rect(
            rect.x().into(),
            rect.y().into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    pub fn fill_rect(&self, rect: &Rect, color: &str) {
        self.context.set_fill_style_str(color);
        self.context.fill_rect(
            rect.x().into(),
            rect.y().into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    /// Rect spun around its own center
    pub fn fill_rotated_rect(&self, rect: &Rect, angle: f32, color: &str) -> Result<()> {
        let center_x = rect.x() + rect.size.width / 2.0;
        let center_y = rect.y() + rect.size.height / 2.0;
        self.context.save();
        self.context
            .translate(center_x.into(), center_y.into())
            .map_err(|err| anyhow!("Could not translate context : {:#?}", err))?;
        self.context
            .rotate(angle.into())
            .map_err(|err| anyhow!("Could not rotate context : {:#?}", err))?;
        self.fill_rect(
            &Rect::new_from_x_y(
                -rect.size.width / 2.0,
                -rect.size.height / 2.0,
                rect.size.width,
                rect.size.height,
            ),
            color,
        );
        self.context.restore();
        Ok(())
    }

    pub fn fill_circle(&self, center: Point, radius: f32, color: &str) -> Result<()> {
        self.context.set_fill_style_str(color);
        self.context.begin_path();
        self.context
            .arc(
                center.x.into(),
                center.y.into(),
                radius.max(0.0).into(),
                0.0,
                std::f64::consts::TAU,
            )
            .map_err(|err| anyhow!("Could not trace circle : {:#?}", err))?;
        self.context.fill();
        Ok(())
    }

    pub fn draw_canvas(&self, source: &HtmlCanvasElement, destination: &Rect) -> Result<()> {
        self.context
            .draw_image_with_html_canvas_element_and_dw_and_dh(
                source,
                destination.x().into(),
                destination.y().into(),
                destination.size.width.into(),
                destination.size.height.into(),
            )
            .map_err(|err| anyhow!("Could not draw canvas : {:#?}", err))
    }

    pub fn draw_backdrop(&self, backdrop: &Backdrop, destination: &Rect, opacity: f32) -> Result<()> {
        self.context.set_global_alpha(opacity.into());
        let drawn = match backdrop {
            Backdrop::Image(image) => self
                .context
                .draw_image_with_html_image_element_and_dw_and_dh(
                    image,
                    destination.x().into(),
                    destination.y().into(),
                    destination.size.width.into(),
                    destination.size.height.into(),
                )
                .map_err(|err| anyhow!("Could not draw backdrop : {:#?}", err)),
            Backdrop::Generated(canvas) => self.draw_canvas(canvas, destination),
        };
        self.context.set_global_alpha(1.0);
        drawn
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let source_name = source.to_string();
    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[engine.rs::load_image] Error loading image {}: {:#?}",
                source_name,
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // ?? - double unwrap because Result<Result<(), Error>, oneshot::Canceled>
    // - first unwrap yields channel result : Result<(), Error>
    // - second unwrap yields image load result : () or propagating Error
    rx.await??;

    Ok(image)
}

/// Vertical gradient painted into a fresh off-screen canvas
/// - `stops` are (offset in 0..=1, css color)
pub fn fallback_gradient(width: u32, height: u32, stops: &[(f32, String)]) -> Result<HtmlCanvasElement> {
    let canvas = browser::new_canvas(width, height)?;
    let context = browser::context(&canvas)?;
    let gradient = context.create_linear_gradient(0.0, 0.0, 0.0, height.into());
    for (offset, color) in stops {
        gradient
            .add_color_stop(*offset, color)
            .map_err(|err| anyhow!("Invalid gradient stop {} {} : {:#?}", offset, color, err))?;
    }
    context.set_fill_style_canvas_gradient(&gradient);
    context.fill_rect(0.0, 0.0, width.into(), height.into());
    Ok(canvas)
}

/// Load a background image, substituting a generated gradient on failure
pub async fn load_backdrop(source: &str, fallback: &[(f32, String)]) -> Result<Backdrop> {
    match load_image(source).await {
        Ok(image) => {
            log!("Parallax layer {} loaded ({}x{})", source, image.width(), image.height());
            Ok(Backdrop::Image(image))
        }
        Err(err) => {
            log!("{}, using fallback gradient", SessionError::resource(source, &err));
            Ok(Backdrop::Generated(fallback_gradient(512, 512, fallback)?))
        }
    }
}
