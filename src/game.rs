use crate::audio::SoundEffects;
use crate::browser;
use crate::camera::Viewport;
use crate::engine::{self, Aabb, Backdrop, Game, KeyState, MobileAction, Point, Rect, Renderer, Size};
use crate::game_state::{GameState, GameStateOwner, LOW_ENERGY, MAX_ENERGY};
use crate::hazard::HazardKind;
use crate::level::LevelConfig;
use crate::lifecycle::SessionError;
use crate::physics::PlayerInput;
use crate::pickup::{self, PickupKind};
use crate::scene::{NodeRef, SceneGraph};
use crate::session::{JourneyHooks, JourneyLeg, JourneyNotice, LevelSession, SessionContext};
use crate::sprite::billboard::{BillboardTexture, CanvasSurface};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use futures::join;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// TABLE
/// ┌───────────────────── Game Architecture Overview ────────────────────────┐
/// │                                                                         │
/// │                              Update Flow                                │
/// │                                                                         │
/// │    ┌─────────────┐          ┌─────────────┐          ┌──────────────┐   │
/// │    │  engine.rs  │  update  │   game.rs   │   tick   │  session.rs  │   │
/// │    │  GameLoop   ├─────────►│   Journey   ├─────────►│ LevelSession │   │
/// │    │  rAF frame  │          │  (input)    │          │ (one leg)    │   │
/// │    └─────────────┘          └──────┬──────┘          └──────┬───────┘   │
/// │                                    │                        │           │
/// │                              ┌─────┴──────┐          ┌──────┴───────┐   │
/// │                              │  KeyState  │          │ JourneyLink  │   │
/// │                              │ keys, taps │          │ owner, sound │   │
/// │                              │ mobile btn │          │ app hooks    │   │
/// │                              └────────────┘          └──────────────┘   │
/// │                                                                         │
/// ├──────────────────────── Call Sequence ──────────────────────────────────┤
/// │                                                                         │
/// │  1. Restart requested by the page? rebuild the level first              │
/// │  2. Taps hit-test pickups through the same Viewport used to draw        │
/// │  3. KeyState -> PlayerInput -> LevelSession::tick()                     │
/// │  4. Queued notices go out to the page once the owner is released        │
/// │  5. draw() walks the SceneGraph far to near, resolving every id         │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
pub enum Journey {
    /// Config and images are still being fetched
    Loading(Setup),

    /// Level built, ticking every frame
    Loaded(Trek),
}

pub struct Setup {
    leg: JourneyLeg,
    link: Rc<JourneyLink>,
    screen: Size,
}

// ==================== Link to the page ====================
/// What the page keeps hold of while the loop owns the game
/// - the owner of energy and water points
/// - the sound service and the app's notification hooks
/// - a restart request, picked up on the next tick
pub struct JourneyLink {
    owner: RefCell<Box<dyn GameStateOwner>>,
    sound: Rc<dyn SoundEffects>,
    hooks: RefCell<Box<dyn JourneyHooks>>,
    restart_requested: Cell<bool>,
}

impl JourneyLink {
    pub fn new(
        owner: Box<dyn GameStateOwner>,
        sound: Rc<dyn SoundEffects>,
        hooks: Box<dyn JourneyHooks>,
    ) -> Rc<Self> {
        Rc::new(JourneyLink {
            owner: RefCell::new(owner),
            sound,
            hooks: RefCell::new(hooks),
            restart_requested: Cell::new(false),
        })
    }

    /// Copy of the persisted record
    pub fn snapshot(&self) -> Result<GameState> {
        self.owner
            .try_borrow()
            .map(|owner| owner.state().clone())
            .map_err(|_| anyhow!("Game state is busy, try again after the frame"))
    }

    pub fn request_restart(&self) {
        self.restart_requested.set(true);
    }

    fn take_restart(&self) -> bool {
        self.restart_requested.replace(false)
    }

    /// Lend the owner to `f`, then deliver whatever it queued
    fn run<R>(
        &self,
        notices: &mut Vec<JourneyNotice>,
        f: impl FnOnce(&mut SessionContext) -> R,
    ) -> Result<R> {
        let result = {
            let mut owner = self
                .owner
                .try_borrow_mut()
                .map_err(|_| SessionError::Tick("game state is already borrowed".into()))?;
            let mut ctx = SessionContext {
                owner: &mut **owner,
                sound: self.sound.as_ref(),
                hooks: &mut *notices,
            };
            f(&mut ctx)
        };
        self.deliver(notices);
        Ok(result)
    }

    fn deliver(&self, notices: &mut Vec<JourneyNotice>) {
        if notices.is_empty() {
            return;
        }
        match self.hooks.try_borrow_mut() {
            Ok(mut hooks) => {
                for notice in notices.drain(..) {
                    notice.deliver(&mut **hooks);
                }
            }
            // a hook that re-enters the game finds it busy, the rest wait a tick
            Err(_) => error!("Journey hooks are busy, {} notices held back", notices.len()),
        }
    }
}

impl Journey {
    pub fn new(leg: JourneyLeg, link: Rc<JourneyLink>, screen: Size) -> Self {
        Journey::Loading(Setup { leg, link, screen })
    }

    async fn load_config() -> LevelConfig {
        match browser::fetch_json::<LevelConfig>(LevelConfig::PATH).await {
            Ok(config) => {
                log!("Level config loaded from {}", LevelConfig::PATH);
                config
            }
            Err(err) => {
                let failure = SessionError::resource(LevelConfig::PATH, &err);
                log!("{}, using the built-in level", failure);
                LevelConfig::default()
            }
        }
    }

    async fn load_sprite_sheet(config: &LevelConfig) -> Result<Backdrop> {
        engine::load_backdrop(&config.sprite_sheet.image, &sheet_fallback())
            .await
            .with_context(|| format!("Failed to load sprite sheet from : {}", config.sprite_sheet.image))
    }

    async fn load_layers(config: &LevelConfig) -> Result<Vec<Backdrop>> {
        join_all(
            config
                .camera
                .layers
                .iter()
                .map(|layer| engine::load_backdrop(&layer.image, &layer.fallback)),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()
        .context("Failed to prepare parallax layers")
    }
}

/// Stand-in sheet, a plain blue card where the character would be
fn sheet_fallback() -> Vec<(f32, String)> {
    vec![(0.0, "#3B82F6".to_string()), (1.0, "#1E40AF".to_string())]
}

#[async_trait(?Send)]
impl Game for Journey {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            Journey::Loading(setup) => {
                let config = Self::load_config().await;
                // sheet and layers are independent, the slowest one sets the wait
                let (sheet, layers) =
                    join!(Self::load_sprite_sheet(&config), Self::load_layers(&config));
                let (sheet, backdrops) = (sheet?, layers?);

                let surface = CanvasSurface::new(config.billboard.texture_size, sheet)
                    .map_err(|err| SessionError::Initialization(format!("{:#}", err)))?;
                let texture = BillboardTexture::new(config.billboard.texture_size)
                    .map_err(|err| SessionError::Initialization(format!("{:#}", err)))?;
                let mut session =
                    LevelSession::new(config, setup.leg, surface, pickup::random_phase)?;
                let mut notices = Vec::new();
                setup
                    .link
                    .run(&mut notices, |ctx| session.begin(ctx))?;
                let scene = SceneGraph::build(&session);

                Ok(Box::new(Journey::Loaded(Trek {
                    session,
                    scene,
                    backdrops,
                    texture,
                    link: setup.link.clone(),
                    notices,
                    screen: setup.screen,
                })))
            }
            Journey::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, keystate: &mut KeyState) -> Result<()> {
        if let Journey::Loaded(trek) = self {
            trek.update(keystate)?;
        }
        Ok(())
    }

    fn draw(&mut self, renderer: &Renderer) -> Result<()> {
        if let Journey::Loaded(trek) = self {
            trek.draw(renderer)?;
        }
        Ok(())
    }

    fn recover(&mut self) -> Result<()> {
        match self {
            Journey::Loaded(trek) => trek.session.recover(),
            Journey::Loading(_) => Ok(()),
        }
    }

    fn dispose(&mut self) {
        if let Journey::Loaded(trek) = self {
            log!("Disposing journey ({:?})", trek.session.leg());
            trek.backdrops.clear();
            trek.notices.clear();
        }
    }
}

// ==================== Input ====================
const LEFT_KEYS: [&str; 2] = ["ArrowLeft", "KeyA"];
const RIGHT_KEYS: [&str; 2] = ["ArrowRight", "KeyD"];
const JUMP_KEYS: [&str; 3] = ["Space", "ArrowUp", "KeyW"];
const SPRINT_KEYS: [&str; 2] = ["ShiftLeft", "ShiftRight"];

/// Keyboard and the touch buttons folded into one tick of input
pub fn player_input(keystate: &KeyState) -> PlayerInput {
    let mobile = keystate.mobile_action();
    let left = keystate.any_pressed(&LEFT_KEYS) || mobile == Some(MobileAction::Left);
    let right = keystate.any_pressed(&RIGHT_KEYS) || mobile == Some(MobileAction::Right);
    PlayerInput {
        axis: f32::from(right as u8) - f32::from(left as u8),
        jump: keystate.any_pressed(&JUMP_KEYS) || mobile == Some(MobileAction::Jump),
        sprint: keystate.any_pressed(&SPRINT_KEYS),
    }
}

// ==================== Loaded level ====================
mod palette {
    pub const SKY: &str = "#87CEEB";
    pub const GROUND: &str = "#DEB887";
    pub const PLATFORM: &str = "#8B4513";
    pub const JERRY_CAN: &str = "#1E90FF";
    pub const ENERGY_ORB: &str = "#FFD700";
    pub const ORB_CORE: &str = "rgba(255, 255, 255, 0.6)";
    pub const FLASH: &str = "#FFFFFF";
    pub const SCORPION: &str = "#8B0000";
    pub const TUMBLEWEED: &str = "#C2B280";
    pub const ENERGY_BACK: &str = "rgba(0, 0, 0, 0.35)";
    pub const ENERGY_OK: &str = "#22C55E";
    pub const ENERGY_LOW: &str = "#EF4444";
}

/// Vertical center of the background planes, world units
const LAYER_CENTER_Y: f32 = 10.0;
/// Ground slab drawn under the walkable plane
const GROUND_DEPTH: f32 = 2.0;
const GROUND_MARGIN: f32 = 50.0;
const SCORPION_RADIUS: f32 = 0.3;
const TUMBLEWEED_RADIUS: f32 = 0.4;
const ENERGY_BAR: Rect = Rect {
    position: Point { x: 16.0, y: 16.0 },
    size: Size {
        width: 200.0,
        height: 14.0,
    },
};

pub struct Trek {
    session: LevelSession<CanvasSurface>,
    scene: SceneGraph,
    /// one per parallax layer, same order as the camera's layers
    backdrops: Vec<Backdrop>,
    /// what the player node shows, behind the billboard's own canvas
    texture: BillboardTexture,
    link: Rc<JourneyLink>,
    notices: Vec<JourneyNotice>,
    screen: Size,
}

impl Trek {
    fn viewport(&self) -> Viewport {
        Viewport::new(
            &self.session.config().camera,
            self.session.camera().x,
            self.screen,
        )
    }

    fn update(&mut self, keystate: &mut KeyState) -> Result<()> {
        let session = &mut self.session;
        if self.link.take_restart() {
            self.link.run(&mut self.notices, |ctx| session.restart(ctx))??;
        }

        let viewport = Viewport::new(&session.config().camera, session.camera().x, self.screen);
        for tap in keystate.take_taps() {
            if let Some(collection) = self
                .link
                .run(&mut self.notices, |ctx| session.handle_tap(tap, &viewport, ctx))?
            {
                log!("Tapped {:?} {:?}", collection.kind, collection.id);
            }
        }

        let input = player_input(keystate);
        self.link
            .run(&mut self.notices, |ctx| session.tick(input, ctx))??;
        keystate.tick();
        Ok(())
    }

    fn draw(&mut self, renderer: &Renderer) -> Result<()> {
        self.screen = renderer.size();
        // skipped frames on mobile keep showing the last upload
        if self.session.billboard_mut().take_dirty() {
            self.texture
                .upload(self.session.billboard().surface().canvas())?;
        }

        let viewport = self.viewport();
        let screen = Rect::new(Point::default(), self.screen);
        renderer.clear(&screen);
        renderer.fill_rect(&screen, palette::SKY);

        for node in self.scene.nodes() {
            match node.target {
                NodeRef::Layer(index) => self.draw_layer(renderer, &viewport, index)?,
                NodeRef::Ground => {
                    let level_width = self.session.physics().config().level_width;
                    let ground = Aabb {
                        min_x: -GROUND_MARGIN,
                        max_x: level_width + GROUND_MARGIN,
                        min_y: -GROUND_DEPTH,
                        max_y: 0.0,
                    };
                    renderer.fill_rect(&viewport.project_bounds(&ground, node.depth), palette::GROUND);
                }
                NodeRef::Platform(id) => {
                    if let Some(platform) = self.session.physics().platform(id) {
                        renderer.fill_rect(
                            &viewport.project_bounds(&platform.bounds, node.depth),
                            palette::PLATFORM,
                        );
                    }
                }
                NodeRef::Pickup(id) => self.draw_pickup(renderer, &viewport, id)?,
                NodeRef::Hazard(id) => self.draw_hazard(renderer, &viewport, id)?,
                NodeRef::Player => {
                    let billboard = self.session.billboard();
                    let rect =
                        viewport.project_bounds(&billboard.world_bounds(), billboard.position().z);
                    renderer.draw_canvas(self.texture.canvas(), &rect)?;
                }
            }
        }

        self.draw_energy(renderer);
        Ok(())
    }

    /// Repeat the layer image across its plane, skipping copies off-screen
    fn draw_layer(&self, renderer: &Renderer, viewport: &Viewport, index: usize) -> Result<()> {
        let config = self.session.config();
        let (Some(layer), Some(spec), Some(backdrop)) = (
            self.session.camera().layers().get(index),
            config.camera.layers.get(index),
            self.backdrops.get(index),
        ) else {
            return Ok(());
        };
        let repeat = (spec.height * spec.scale).max(1.0);
        let left = layer.x - layer.tile_width / 2.0;
        let copies = (layer.tile_width / repeat).ceil() as usize;
        let screen = viewport.screen();
        for copy in 0..copies {
            let min_x = left + copy as f32 * repeat;
            let bounds = Aabb {
                min_x,
                max_x: min_x + repeat,
                min_y: LAYER_CENTER_Y - spec.height / 2.0,
                max_y: LAYER_CENTER_Y + spec.height / 2.0,
            };
            let rect = viewport.project_bounds(&bounds, layer.depth);
            if rect.right() < 0.0 || rect.x() > screen.width {
                continue;
            }
            renderer.draw_backdrop(backdrop, &rect, spec.opacity)?;
        }
        Ok(())
    }

    fn draw_pickup(&self, renderer: &Renderer, viewport: &Viewport, id: pickup::PickupId) -> Result<()> {
        let pickups = self.session.pickups();
        let Some(item) = pickups.get(id).filter(|item| item.is_visible()) else {
            return Ok(());
        };
        let rect = viewport.project_bounds(&item.visual_bounds(pickups.config()), item.spawn.z);
        match item.kind {
            PickupKind::JerryCan => {
                let color = if item.is_flashing() {
                    palette::FLASH
                } else {
                    palette::JERRY_CAN
                };
                renderer.fill_rect(&rect, color);
            }
            PickupKind::EnergyOrb => {
                let color = if item.is_flashing() {
                    palette::FLASH
                } else {
                    palette::ENERGY_ORB
                };
                let center = Point {
                    x: rect.x() + rect.size.width / 2.0,
                    y: rect.y() + rect.size.height / 2.0,
                };
                renderer.fill_circle(center, rect.size.width / 2.0, color)?;
                // a spinning core so the rotation reads on a flat circle
                let core = rect.size.width / 3.0;
                renderer.fill_rotated_rect(
                    &Rect::new_from_x_y(center.x - core / 2.0, center.y - core / 2.0, core, core),
                    item.rotation.0 + item.rotation.1,
                    palette::ORB_CORE,
                )?;
            }
        }
        Ok(())
    }

    fn draw_hazard(&self, renderer: &Renderer, viewport: &Viewport, id: crate::hazard::HazardId) -> Result<()> {
        let Some(hazard) = self.session.hazards().get(id) else {
            return Ok(());
        };
        let position = hazard.position;
        match hazard.kind {
            HazardKind::Scorpion => {
                let bounds = Aabb::around(position.x, position.y, SCORPION_RADIUS, SCORPION_RADIUS);
                renderer.fill_rect(&viewport.project_bounds(&bounds, position.z), palette::SCORPION);
            }
            HazardKind::Tumbleweed => {
                let bounds =
                    Aabb::around(position.x, position.y, TUMBLEWEED_RADIUS, TUMBLEWEED_RADIUS);
                renderer.fill_rotated_rect(
                    &viewport.project_bounds(&bounds, position.z),
                    hazard.spin,
                    palette::TUMBLEWEED,
                )?;
            }
        }
        Ok(())
    }

    fn draw_energy(&self, renderer: &Renderer) {
        // a hook may hold the state mid-frame, the bar just skips a frame
        let Ok(state) = self.link.snapshot() else {
            return;
        };
        renderer.fill_rect(&ENERGY_BAR, palette::ENERGY_BACK);
        let fill = Rect::new(
            ENERGY_BAR.position,
            Size {
                width: ENERGY_BAR.size.width * (state.energy / MAX_ENERGY),
                height: ENERGY_BAR.size.height,
            },
        );
        let color = if state.energy <= LOW_ENERGY {
            palette::ENERGY_LOW
        } else {
            palette::ENERGY_OK
        };
        renderer.fill_rect(&fill, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InputEvent;

    #[test]
    fn arrows_and_wasd_both_steer() {
        let mut keystate = KeyState::new();
        keystate.apply(InputEvent::KeyDown("KeyA".into()));
        assert_eq!(player_input(&keystate).axis, -1.0);
        keystate.apply(InputEvent::KeyDown("ArrowRight".into()));
        // both held cancel out
        assert_eq!(player_input(&keystate).axis, 0.0);
        keystate.apply(InputEvent::KeyUp("KeyA".into()));
        assert_eq!(player_input(&keystate).axis, 1.0);
    }

    #[test]
    fn shift_sprints_and_space_jumps() {
        let mut keystate = KeyState::new();
        keystate.apply(InputEvent::KeyDown("ShiftLeft".into()));
        keystate.apply(InputEvent::KeyDown("Space".into()));
        let input = player_input(&keystate);
        assert!(input.sprint);
        assert!(input.jump);
    }

    #[test]
    fn touch_buttons_act_like_keys() {
        let mut keystate = KeyState::new();
        keystate.apply(InputEvent::Mobile(MobileAction::Jump));
        assert!(player_input(&keystate).jump);
        keystate.apply(InputEvent::Mobile(MobileAction::Left));
        assert_eq!(player_input(&keystate).axis, -1.0);
        assert!(!player_input(&keystate).jump);
    }

    #[test]
    fn no_input_stands_still() {
        assert_eq!(player_input(&KeyState::new()), PlayerInput::default());
    }
}
